// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: place one door or window on a floor plan through the render service
//!
//! Usage:
//!   render-opening <drawing.svg> <preview.png> [options]

use anyhow::{bail, Context, Result};
use planedit_geometry::{OpeningCandidate, Point2D, RoomPalette, SwingDirection};
use planedit_render::{
    EditorSession, HttpRenderClient, Orchestrator, Outcome, Plan, Raster, RenderServiceConfig,
};
use std::env;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Options {
    drawing_path: String,
    preview_path: String,
    list_only: bool,
    wall_id: Option<String>,
    at: Option<Point2D>,
    position: f64,
    width_inches: f64,
    window: bool,
    swing: Option<SwingDirection>,
    rooms_schema: Option<String>,
    plan_id: String,
    output_png: String,
    output_svg: String,
}

fn print_usage() {
    println!("Usage: render-opening <drawing.svg> <preview.png> [options]");
    println!();
    println!("Options:");
    println!("  --list                 List walls and exit");
    println!("  --wall <ID>            Host wall id");
    println!("  --at <X,Y>             Pick the wall nearest to a preview pixel");
    println!("  --position <F>         Opening center along the wall, 0..1 (default 0.5)");
    println!("  --width <INCHES>       Opening width (default 36)");
    println!("  --window               Place a window instead of a door");
    println!("  --swing <left|right>   Door swing side");
    println!("  --rooms-schema <PATH>  Room palette from a rooms schema JSON");
    println!("  --plan-id <ID>         Plan id sent to the service (default: file stem)");
    println!("  --output-png <PATH>    Rendered preview output (default rendered.png)");
    println!("  --output-svg <PATH>    Updated drawing output (default rendered.svg)");
    println!();
    println!("Service settings come from RENDER_BASE_URL, RENDER_POLL_INTERVAL_MS,");
    println!("RENDER_MAX_POLL_ATTEMPTS and related variables.");
}

fn parse_args(args: &[String]) -> Result<Options> {
    if args.len() < 3 {
        bail!("expected <drawing.svg> <preview.png>");
    }
    let drawing_path = args[1].clone();
    let plan_id = std::path::Path::new(&drawing_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plan")
        .to_string();

    let mut options = Options {
        drawing_path,
        preview_path: args[2].clone(),
        list_only: false,
        wall_id: None,
        at: None,
        position: 0.5,
        width_inches: 36.0,
        window: false,
        swing: None,
        rooms_schema: None,
        plan_id,
        output_png: "rendered.png".into(),
        output_svg: "rendered.svg".into(),
    };

    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .cloned()
                .with_context(|| format!("{} needs a value", flag))
        };
        match flag.as_str() {
            "--list" => options.list_only = true,
            "--window" => options.window = true,
            "--wall" => options.wall_id = Some(value()?),
            "--at" => {
                let raw = value()?;
                let (x, y) = raw
                    .split_once(',')
                    .with_context(|| format!("--at expects X,Y, got {}", raw))?;
                options.at = Some(Point2D::new(
                    x.trim().parse().context("invalid --at x")?,
                    y.trim().parse().context("invalid --at y")?,
                ));
            }
            "--position" => options.position = value()?.parse().context("invalid --position")?,
            "--width" => options.width_inches = value()?.parse().context("invalid --width")?,
            "--swing" => {
                options.swing = Some(match value()?.as_str() {
                    "left" => SwingDirection::Left,
                    "right" => SwingDirection::Right,
                    other => bail!("unknown swing direction: {}", other),
                })
            }
            "--rooms-schema" => options.rooms_schema = Some(value()?),
            "--plan-id" => options.plan_id = value()?,
            "--output-png" => options.output_png = value()?,
            "--output-svg" => options.output_svg = value()?,
            other => bail!("unknown option: {}", other),
        }
    }
    Ok(options)
}

fn list_walls(session: &EditorSession) {
    println!("{} walls:", session.walls().len());
    for wall in session.walls() {
        let rooms: Vec<&str> = wall.adjacent_room_ids.iter().flatten().map(String::as_str).collect();
        println!(
            "  {:<10} {:>8} len {:>7.1}  ({:.1},{:.1}) -> ({:.1},{:.1})  {}",
            wall.id,
            if wall.is_exterior { "exterior" } else { "interior" },
            wall.length,
            wall.start.x,
            wall.start.y,
            wall.end.x,
            wall.end.y,
            rooms.join(" | ")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,planedit_render=debug")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }
    let options = parse_args(&args)?;

    let drawing = fs::read_to_string(&options.drawing_path)
        .with_context(|| format!("cannot read drawing {}", options.drawing_path))?;
    let preview = fs::read(&options.preview_path)
        .with_context(|| format!("cannot read preview {}", options.preview_path))?;
    let palette = match &options.rooms_schema {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?;
            RoomPalette::from_rooms_schema(&json)?
        }
        None => RoomPalette::default(),
    };

    let service = RenderServiceConfig::from_env();
    tracing::info!(
        base_url = %service.base_url,
        poll_interval_ms = service.poll_interval_ms,
        max_poll_attempts = service.max_poll_attempts,
        "Render service configured"
    );

    let plan = Plan::new(&options.plan_id, drawing, Raster::from_png(preview)?);
    let session = EditorSession::new(plan, palette, service.orchestrator_config());
    if !session.editing_available() {
        bail!("opening editing is unavailable: no walls or no usable view box");
    }
    if options.list_only {
        list_walls(&session);
        return Ok(());
    }

    let (wall_id, position) = match (&options.wall_id, &options.at) {
        (Some(id), _) => (id.clone(), options.position),
        (None, Some(point)) => {
            let hit = session
                .wall_at(point, 25.0)
                .with_context(|| format!("no wall within 25 px of ({}, {})", point.x, point.y))?;
            println!("Picked {} at {:.3}", hit.wall_id, hit.position_on_wall);
            (hit.wall_id, hit.position_on_wall)
        }
        (None, None) => bail!("pass --wall <ID> or --at <X,Y> (use --list to see walls)"),
    };

    let mut candidate = if options.window {
        OpeningCandidate::window(wall_id, position, options.width_inches)
    } else {
        OpeningCandidate::door(wall_id, position, options.width_inches)
    };
    if let Some(swing) = options.swing {
        candidate = candidate.with_swing(swing);
    }

    let client = Arc::new(HttpRenderClient::new(&service)?);
    let mut orchestrator = Orchestrator::new(session, client);
    let key = orchestrator.place_opening(candidate)?;
    println!("Submitted job {}", key);

    let mut succeeded = false;
    while let Some(outcome) = orchestrator.next_update().await {
        match outcome {
            Outcome::Progress { progress: Some(p), .. } => println!("  progress {:.0}%", p * 100.0),
            Outcome::Completed { opening_id, .. } => {
                println!("Opening {} rendered", opening_id);
                succeeded = true;
                // Skip the completion grace period
                break;
            }
            Outcome::Failed { reason, .. } => bail!("render failed: {}", reason),
            _ => {}
        }
    }
    if !succeeded {
        bail!("render job ended without a result");
    }

    let session = orchestrator.into_session();
    let plan = session.plan();
    fs::write(&options.output_png, plan.raster.bytes())
        .with_context(|| format!("cannot write {}", options.output_png))?;
    fs::write(&options.output_svg, &plan.drawing)
        .with_context(|| format!("cannot write {}", options.output_svg))?;
    println!("Wrote {} and {}", options.output_png, options.output_svg);
    Ok(())
}
