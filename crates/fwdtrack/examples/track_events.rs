use fwdtrack::{EventFileSource, ForwardTracker, HitSource, StraightLineFitter, TrackerConfig};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <events.json> [config.json]", args[0]);
        std::process::exit(2);
    }

    let config = match args.get(2) {
        Some(path) => TrackerConfig::from_json_file(Path::new(path))?,
        None => TrackerConfig::default(),
    };
    let source = EventFileSource::from_json_file(Path::new(&args[1]), config.layout.clone())?;
    let tracker = ForwardTracker::new(config)?;
    let mut fitter = StraightLineFitter::default();

    for event in 0..source.n_events() as u64 {
        let result = tracker.process_event(&source, event, &mut fitter)?;
        println!(
            "event {}: {} hits, {} tracks, {} hits left",
            event,
            result.n_hits,
            result.tracks.len(),
            result.residual_hits()
        );
        for track in &result.tracks {
            let pt = track.fitted_pt().unwrap_or(f64::NAN);
            println!("  iteration {} hits {:?} pt {:.3}", track.iteration, track.hit_ids, pt);
        }
    }
    Ok(())
}
