use anyhow::Result;
use log::info;
use stabilizer::examples::{JitterGen, SceneGen};
use stabilizer::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let scene = SceneGen::new(0.1)
        .symbol("4006381333931", JitterGen::new(120.0, 200.0, 160.0, 60.0, 4.0))
        .symbol("4006381333931", JitterGen::new(420.0, 200.0, 160.0, 60.0, 4.0))
        .symbol(
            "https://example.org/qr",
            JitterGen::new_drifting(300.0, 400.0, 90.0, 90.0, 3.0, (1.5, -0.5)),
        );

    let opts = StabilizerOptions::default().max_idle_epochs(2);
    let worker = StabilizerWorker::new(opts)?;
    let viewport = Viewport::new((1280.0, 720.0), (640.0, 360.0))
        .ok_or_else(|| anyhow::anyhow!("Viewport sizes must be positive"))?;

    for (frame_id, detections) in scene.take(30).enumerate() {
        let res = worker.submit(frame_id as u64, detections)?.get()?;
        for s in res.symbols {
            let on_screen = viewport.to_display(&s.bbox);
            println!(
                "frame={:02} track={} key={} color={:08x} box=({:.0}, {:.0}, {:.0}, {:.0}) len={}",
                res.frame_id,
                s.track_id,
                s.key,
                s.color.as_argb(),
                on_screen.left(),
                on_screen.top(),
                on_screen.right(),
                on_screen.bottom(),
                s.length
            );
        }
    }

    let registry = worker.registry();
    let registry = registry
        .read()
        .map_err(|_| anyhow::anyhow!("Identity registry lock is poisoned"))?;
    info!("Distinct keys seen: {}", registry.len());
    Ok(())
}
