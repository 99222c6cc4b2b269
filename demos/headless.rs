use std::time::Duration;

use canopy::prelude::*;

/// Complete tree `depth` levels deep with `fanout` children per node.
fn build(label: String, depth: u32, fanout: u32) -> NodeSpec {
    let node = NodeSpec::new(label.clone());
    if depth == 0 {
        return node;
    }
    node.children((0..fanout).map(|i| build(format!("{label}.{i}"), depth - 1, fanout)))
}

fn main() {
    env_logger::init();

    let context = match GpuContext::new() {
        Ok(context) => context,
        Err(error) => {
            eprintln!("{}", fallback_message(&EngineError::from(error)));
            return;
        }
    };

    let config = ViewerConfig::default().width(1280).height(720);
    let backend = WgpuBackend::offscreen(&context, config.width, config.height);
    let mut viewer = match Viewer::new(backend, config) {
        Ok(viewer) => viewer,
        Err(error) => {
            eprintln!("{}", fallback_message(&error));
            return;
        }
    };

    viewer.send(Command::SetTree(Tree::from_spec(build("root".into(), 6, 3))));
    viewer.send(Command::UpdateSettings(
        Settings::default().palette("vaporWave").grid(true),
    ));

    for frame in 0..120 {
        if frame == 60 {
            viewer.send(Command::SelectNode(Some(NodeId::from_index(1))));
        }
        if let Some(stats) = viewer.tick() {
            log::info!(
                "Frame {}: {} primitives, {} vertices, {} program switches",
                frame,
                stats.primitives,
                stats.vertices,
                stats.program_switches
            );
        }
        for event in viewer.take_events() {
            match event {
                EngineEvent::Fatal(message) => {
                    eprintln!("{message}");
                    return;
                }
                other => log::info!("{:?}", other),
            }
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    viewer.shutdown();
}
