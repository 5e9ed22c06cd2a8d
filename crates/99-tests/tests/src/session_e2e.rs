use app::Pacing;
use crossbeam_channel::Receiver;
use hub::{Coordinator, Phase, RendererPlacement, SessionConfig};
use mock::{BouncingBall, RecordingPlatform, StaticLoader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use service_abi::{keys, Event, LogLevel};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PATIENCE: Duration = Duration::from_secs(5);

fn config(pacing: Pacing, renderer: RendererPlacement) -> SessionConfig {
    SessionConfig {
        pacing,
        renderer,
        target_fps: 240,
        idle_poll_ms: 1,
        ..SessionConfig::default()
    }
}

fn observed(hub: &Coordinator) -> Receiver<Phase> {
    let (tx, rx) = crossbeam_channel::unbounded();
    hub.subscribe(move |phase| {
        let _ = tx.send(phase);
    });
    rx
}

fn recv_until(phases: &Receiver<Phase>, last: Phase) -> Vec<Phase> {
    let mut seen = Vec::new();
    while seen.last() != Some(&last) {
        seen.push(phases.recv_timeout(PATIENCE).unwrap());
    }
    seen
}

fn setup() -> (Arc<RecordingPlatform>, Coordinator) {
    let _ = env_logger::builder().is_test(true).try_init();
    let platform = Arc::new(RecordingPlatform::new());
    let loader = StaticLoader::demo().with("short_ball", || BouncingBall::new().with_frame_limit(5));
    let hub = Coordinator::new(platform.clone(), Arc::new(loader));
    (platform, hub)
}

#[test]
fn repeated_runs_walk_the_full_lifecycle() {
    let (platform, mut hub) = setup();
    hub.init(config(Pacing::Blocking, RendererPlacement::Dispatcher))
        .unwrap();
    let phases = observed(&hub);

    for _ in 0..5 {
        let _ = hub.start("bouncing_ball").unwrap();
        assert_eq!(recv_until(&phases, Phase::Running), vec![Phase::Started, Phase::Running]);
        let seen = platform.frames_presented();
        assert!(platform.wait_until(PATIENCE, |r| r.frames_presented > seen));
        let _ = hub.stop().unwrap();
        assert_eq!(recv_until(&phases, Phase::Stopped), vec![Phase::Stopping, Phase::Stopped]);
    }
    assert_eq!(hub.state(), Phase::Stopped);
}

#[test]
fn programs_that_finish_leave_the_session_reusable() {
    let (platform, mut hub) = setup();
    hub.init(config(Pacing::Blocking, RendererPlacement::Dedicated))
        .unwrap();
    let phases = observed(&hub);

    for run in 1..=3 {
        let _ = hub.start("short_ball").unwrap();
        assert_eq!(
            recv_until(&phases, Phase::Stopped),
            vec![Phase::Started, Phase::Running, Phase::Stopped]
        );
        let recording = platform.snapshot();
        let finished = recording
            .logs
            .iter()
            .filter(|(level, text)| *level == LogLevel::Info && text == "bouncing ball drew 5 frames")
            .count();
        assert_eq!(finished, run);
    }
    assert!(platform.wait_until(PATIENCE, |r| r.frames_presented == 15));
}

#[test]
fn destroy_releases_a_parked_lockstep_producer() {
    let (platform, mut hub) = setup();
    hub.init(config(Pacing::Locking, RendererPlacement::Dedicated))
        .unwrap();
    hub.start("bouncing_ball")
        .unwrap()
        .wait_timeout(PATIENCE)
        .unwrap();
    hub.commit_inputs().unwrap();
    assert!(platform.wait_until(PATIENCE, |r| r.frames_presented >= 1));

    let began = Instant::now();
    hub.destroy();
    assert!(began.elapsed() < PATIENCE);
    assert!(!hub.is_active());
    assert_eq!(hub.state(), Phase::Stopped);
}

#[test]
fn session_can_be_reinitialised_with_other_settings() {
    let (platform, mut hub) = setup();
    for (pacing, renderer) in [
        (Pacing::Blocking, RendererPlacement::Dedicated),
        (Pacing::Locking, RendererPlacement::Dispatcher),
        (Pacing::Blocking, RendererPlacement::Dispatcher),
    ] {
        hub.init(config(pacing, renderer)).unwrap();
        let phases = observed(&hub);
        let _ = hub.start("short_ball").unwrap();
        // Lockstep needs a commit per frame.
        let deadline = Instant::now() + PATIENCE;
        loop {
            match phases.try_recv() {
                Ok(Phase::Stopped) => break,
                Ok(_) => {}
                Err(_) if Instant::now() > deadline => panic!("{pacing} run did not finish"),
                Err(_) => {
                    if pacing == Pacing::Locking {
                        hub.commit_inputs().unwrap();
                    }
                    std::thread::sleep(Duration::from_millis(2));
                }
            }
        }
    }
    let recording = platform.snapshot();
    assert_eq!(
        recording
            .logs
            .iter()
            .filter(|(_, text)| text == "bouncing ball drew 5 frames")
            .count(),
        3
    );
}

#[test]
#[ignore]
fn slow_random_input_storm() {
    let (platform, mut hub) = setup();
    hub.init(config(Pacing::Blocking, RendererPlacement::Dispatcher))
        .unwrap();
    hub.start("input_echo").unwrap().wait_timeout(PATIENCE).unwrap();

    let mut rng = StdRng::seed_from_u64(0x5EED_F00D);
    let playable = [keys::SPACE, keys::LEFT, keys::RIGHT, keys::UP, keys::DOWN];
    for _ in 0..2_000 {
        let key = playable[rng.gen_range(0..playable.len())];
        let event = match rng.gen_range(0..4) {
            0 => Event::KeyDown { key },
            1 => Event::KeyUp { key },
            2 => Event::WheelMove {
                direction: rng.gen_range(-3..=3),
            },
            _ => Event::PointerMove {
                x: rng.gen_range(0.0..320.0),
                y: rng.gen_range(0.0..200.0),
            },
        };
        hub.send(&event).unwrap();
        if rng.gen_bool(0.25) {
            hub.commit_inputs().unwrap();
            std::thread::sleep(Duration::from_micros(200));
        }
    }
    hub.commit_inputs().unwrap();
    assert_eq!(hub.state(), Phase::Running);

    hub.stop().unwrap().wait_timeout(PATIENCE).unwrap();
    assert!(platform.frames_presented() > 0);
    assert!(!platform.snapshot().has_log(LogLevel::Fatal, ""));
}
