mod common;

use std::collections::HashSet;

use glam::{uvec2, Vec3};
use wavefront::gpu::{workgroups_for, PassFlags, RAY_WORKGROUP_SIZE};
use wavefront::{Backend, QueueSlot, Schedule, Step, TracerConfig};

use self::common::*;

#[test]
fn halving_paths() {
    let mut tracer = tracer(HalvingKernels, uvec2(64, 64), config(3));

    tracer.compute_sample_with_seed(&mut (), 1);

    let backend = tracer.backend();
    let trace = &backend.traces()[0];

    assert_eq!(4096, trace.primary_rays);

    let active: Vec<_> = trace
        .bounces
        .iter()
        .map(|bounce| (bounce.active_before, bounce.active_after))
        .collect();

    assert_eq!(vec![(4096, 2048), (2048, 1024)], active);

    let groups: Vec<_> =
        trace.bounces.iter().map(|bounce| bounce.groups).collect();

    assert_eq!(vec![64, 32], groups);

    let sources: Vec<_> =
        trace.bounces.iter().map(|bounce| bounce.source).collect();

    assert_eq!(vec![QueueSlot::A, QueueSlot::B], sources);

    assert_eq!(3072, trace.terminated);
    assert_eq!(1024, trace.forced);
    assert_eq!(4096, trace.contributions);

    // Survivors are exactly the pixels with both lowest bits cleared
    let survivors: HashSet<_> = backend
        .active_rays(QueueSlot::A)
        .iter()
        .map(|ray| ray.pixel)
        .collect();

    assert_eq!(1024, survivors.len());
    assert!(survivors.iter().all(|pixel| pixel % 4 == 0));

    let output = backend.output();

    assert_eq!(1, output.samples);
    assert_eq!(Vec3::ZERO, output.pixel(uvec2(0, 0)));
    assert_eq!(Vec3::ONE, output.pixel(uvec2(1, 0)));
    assert_eq!(Vec3::ONE, output.pixel(uvec2(2, 0)));
    assert_eq!(Vec3::ZERO, output.pixel(uvec2(4, 0)));
}

#[test]
fn camera_paths_without_russian_roulette() {
    let mut tracer = tracer(CameraKernels, uvec2(64, 64), config(4));

    tracer.compute_sample_with_seed(&mut (), 3);

    let trace = &tracer.backend().traces()[0];

    let active: Vec<_> = trace
        .bounces
        .iter()
        .map(|bounce| (bounce.active_before, bounce.active_after))
        .collect();

    assert_eq!(vec![(4096, 4096); 3], active);
    assert_eq!(0, trace.terminated);
    assert_eq!(4096, trace.forced);
    assert_eq!(4096, trace.contributions);
}

#[test]
fn camera_paths_with_russian_roulette() {
    let config = TracerConfig {
        russian_roulette: true,
        ..config(4)
    };

    let mut tracer = tracer(CameraKernels, uvec2(64, 64), config);

    tracer.compute_sample_with_seed(&mut (), 3);

    let trace = &tracer.backend().traces()[0];
    let after: Vec<_> =
        trace.bounces.iter().map(|bounce| bounce.active_after).collect();

    // Primary rays carry unit throughput, so nothing dies on the first
    // bounce; afterwards survival drops to 0.5
    assert_eq!(4096, trace.bounces[0].active_before);
    assert_eq!(4096, after[0]);
    assert!(after[1] > 1024 && after[1] < 3072, "{after:?}");
    assert!(after[2] < after[1], "{after:?}");

    assert_eq!(4096 - after[2], trace.terminated);
    assert_eq!(after[2], trace.forced);
    assert_eq!(4096, trace.contributions);
}

#[test]
fn queues_stay_bounded_and_conserve_paths() {
    let kernels = RandomWalkKernels {
        miss_odd_pixels: true,
        ..Default::default()
    };

    let mut tracer = tracer(kernels, uvec2(64, 32), config(6));
    let pixel_count = 64 * 32;

    for seed in 0..4 {
        tracer.compute_sample_with_seed(&mut (), seed);
    }

    for trace in tracer.backend().traces() {
        assert_eq!(pixel_count, trace.primary_rays);
        assert_eq!(5, trace.bounces.len());

        for bounce in &trace.bounces {
            assert!(bounce.active_after <= bounce.active_before);
            assert!(bounce.active_after <= pixel_count);

            assert_eq!(
                workgroups_for(bounce.active_before, RAY_WORKGROUP_SIZE),
                bounce.groups
            );
        }

        // Only even pixels had their primary ray hit anything
        assert!(trace.bounces[0].active_after <= pixel_count / 2);

        assert_eq!(pixel_count, trace.terminated + trace.forced);
        assert_eq!(pixel_count, trace.contributions);
    }
}

#[test]
fn queues_alternate() {
    let mut tracer =
        tracer(RandomWalkKernels::default(), uvec2(16, 16), config(5));

    tracer.compute_sample_with_seed(&mut (), 123);

    let trace = &tracer.backend().traces()[0];

    for bounce in &trace.bounces {
        let expected = QueueSlot::from_index((bounce.bounce - 1) as usize);

        assert_eq!(expected, bounce.source);
        assert_eq!(bounce.bounce % 2, bounce.ping_pong);
    }

    // Paths still alive are exactly the ones left in the last target queue
    let last = QueueSlot::from_index(trace.bounces.len() % 2);
    let backend = tracer.backend();

    let pixels: HashSet<_> = backend
        .active_rays(last)
        .iter()
        .map(|ray| ray.pixel)
        .collect();

    assert_eq!(trace.forced as usize, pixels.len());
    assert_eq!(backend.active_rays(last).len(), pixels.len());
}

#[test]
fn primary_only() {
    let mut tracer = tracer(HalvingKernels, uvec2(8, 8), config(1));

    tracer.compute_sample_with_seed(&mut (), 0);

    let trace = &tracer.backend().traces()[0];

    assert!(trace.bounces.is_empty());
    assert_eq!(0, trace.terminated);
    assert_eq!(64, trace.forced);
    assert_eq!(64, trace.contributions);
}

#[test]
fn last_bounce_is_flagged() {
    let tracer = tracer(HalvingKernels, uvec2(8, 8), config(4));
    let schedule = Schedule::sample(tracer.layout(), tracer.config(), 0, false);

    let flags: Vec<_> = schedule
        .steps()
        .iter()
        .filter_map(|step| match step {
            Step::GeneratePrimary(params) => Some(params),
            Step::TraceBounce { params, .. } => Some(params),
            _ => None,
        })
        .map(|params| (params.bounce, params.has(PassFlags::LAST_BOUNCE)))
        .collect();

    assert_eq!(vec![(0, false), (1, false), (2, false), (3, true)], flags);
}

#[test]
#[should_panic]
fn missing_barrier_is_rejected() {
    let mut tracer = tracer(HalvingKernels, uvec2(8, 8), config(2));

    let schedule = Schedule::from_steps([
        Step::BeginSample,
        Step::BeginBounce,
        Step::EndBounce,
    ]);

    tracer.backend_mut().run(&mut (), &schedule);
}
