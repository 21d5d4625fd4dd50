use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use svgbake::{
    AspectRatio, PaintCommand, PaintServerSpec, PatternSpec, PatternTileBaker, Rect, Transform, Units, parse_transform,
};
use tiny_skia::{Color, Pixmap};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo xtask <command>");
        eprintln!("Commands:");
        eprintln!("  bake-fixtures [dir]    Render every pattern scenario, baked and direct, as PNG");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "bake-fixtures" => {
            let out_dir = match args.get(2) {
                Some(dir) => Utf8PathBuf::from(dir),
                None => Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("../target/fixtures"),
            };
            if let Err(e) = bake_fixtures(&out_dir) {
                eprintln!("bake-fixtures failed: {e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            std::process::exit(1);
        }
    }
}

/// A shape filled with a pattern
struct Scenario {
    name: &'static str,
    pattern: PatternSpec,
    /// `patternTransform`, parsed when the scenario renders
    pattern_transform: &'static str,
    content: Vec<(f64, f64, f64, f64)>,
    shape: Rect,
    shape_transform: &'static str,
    canvas: (u32, u32),
}

fn scenarios() -> Vec<Scenario> {
    let user_cell = |view_box: Option<Rect>, content_units: Units| PatternSpec {
        id: "TestPattern".into(),
        units: Units::UserSpaceOnUse,
        content_units,
        transform: Transform::IDENTITY,
        rect: Rect::new(60.0, 0.0, 30.0, 20.0),
        view_box,
        aspect: AspectRatio::default(),
    };
    let base_shape = Rect::new(10.0, 20.0, 40.0, 120.0);

    vec![
        Scenario {
            name: "pattern_user_content_user",
            pattern: user_cell(None, Units::UserSpaceOnUse),
            pattern_transform: "",
            content: vec![(70.0, 0.0, 10.0, 13.3333), (80.0, 6.3333, 10.0, 6.6666)],
            shape: base_shape,
            shape_transform: "translate(40 30) scale(2 0.5)",
            canvas: (160, 160),
        },
        Scenario {
            name: "pattern_user_content_view",
            pattern: user_cell(Some(Rect::new(10.0, 10.0, 60.0, 90.0)), Units::UserSpaceOnUse),
            pattern_transform: "",
            content: vec![(30.0, 10.0, 20.0, 60.0), (50.0, 39.0, 20.0, 30.0)],
            shape: base_shape,
            shape_transform: "translate(40 30) scale(2 0.5)",
            canvas: (160, 160),
        },
        Scenario {
            name: "pattern_user_content_obb",
            pattern: user_cell(None, Units::ObjectBoundingBox),
            pattern_transform: "",
            content: vec![(1.5, -0.1666, 0.25, 0.111), (1.75, -0.12, 0.25, 0.07)],
            shape: base_shape,
            shape_transform: "translate(40 30) scale(2 0.5)",
            canvas: (160, 160),
        },
        Scenario {
            name: "pattern_user_content_view_rotated",
            pattern: user_cell(Some(Rect::new(10.0, 10.0, 60.0, 90.0)), Units::UserSpaceOnUse),
            pattern_transform: "translate(40 10) rotate(90)",
            content: vec![(30.0, 10.0, 20.0, 60.0), (50.0, 40.0, 20.0, 30.0)],
            shape: Rect::new(20.0, 10.0, 60.0, 90.0),
            shape_transform: "translate(50 50) scale(2 1)",
            canvas: (220, 160),
        },
    ]
}

fn bake_fixtures(out_dir: &Utf8Path) -> Result<(), String> {
    std::fs::create_dir_all(out_dir).map_err(|e| format!("{out_dir}: {e}"))?;

    let results: Vec<(&'static str, Result<(u32, u32), String>)> = scenarios()
        .par_iter()
        .map(|scenario| (scenario.name, render(scenario, out_dir)))
        .collect();

    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok((w, h)) => eprintln!("  ok    {name} (tile {w}x{h})"),
            Err(e) => {
                failed += 1;
                eprintln!("  FAIL  {name}: {e}");
            }
        }
    }
    eprintln!("{} scenarios, {} failed, output in {out_dir}", results.len(), failed);

    if failed > 0 {
        return Err(format!("{failed} scenarios failed"));
    }
    Ok(())
}

/// Writes `<name>.png` (baked tile stamped) and `<name>_direct.png`
fn render(scenario: &Scenario, out_dir: &Utf8Path) -> Result<(u32, u32), String> {
    let shape_transform = parse_transform(scenario.shape_transform).map_err(|e| e.to_string())?;
    let pattern = PatternSpec {
        transform: parse_transform(scenario.pattern_transform).map_err(|e| format!("patternTransform: {e}"))?,
        ..scenario.pattern.clone()
    };
    let spec = PaintServerSpec::Pattern(pattern);
    let chain = spec.resolve(scenario.shape, shape_transform).map_err(|e| e.to_string())?;

    let red = Color::from_rgba8(255, 0, 0, 255);
    let commands: Vec<PaintCommand> = scenario
        .content
        .iter()
        .filter_map(|&(x, y, w, h)| PaintCommand::rect(Rect::new(x, y, w, h), red))
        .collect();
    let outline = PaintCommand::rect(scenario.shape, Color::BLACK)
        .ok_or("empty shape")?
        .path;

    let baker = PatternTileBaker::default();
    let bounds = baker.tile_bounds(&chain).map_err(|e| e.to_string())?;
    let tile = baker.bake(&commands, &chain, bounds).map_err(|e| e.to_string())?;

    let (width, height) = scenario.canvas;
    let mut stamped = Pixmap::new(width, height).ok_or("canvas allocation failed")?;
    tile.fill(&mut stamped, &outline, shape_transform).map_err(|e| e.to_string())?;
    save(&stamped, &out_dir.join(format!("{}.png", scenario.name)))?;

    let mut direct = Pixmap::new(width, height).ok_or("canvas allocation failed")?;
    baker
        .render_direct(&commands, &chain, &mut direct, &outline)
        .map_err(|e| e.to_string())?;
    save(&direct, &out_dir.join(format!("{}_direct.png", scenario.name)))?;

    Ok(bounds)
}

fn save(pixmap: &Pixmap, path: &Utf8Path) -> Result<(), String> {
    pixmap.save_png(path).map_err(|e| format!("{path}: {e}"))
}
