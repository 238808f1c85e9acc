use thiserror::Error;

use crate::gpu::{AccumulatePassParams, PassFlags, RayPassParams};
use crate::{TracerConfig, TracerLayout};

/// One of the two ray queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueSlot {
    A,
    B,
}

impl QueueSlot {
    pub fn from_index(idx: usize) -> Self {
        if idx % 2 == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Device resources touched by steps; used to find where barriers are due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Header,
    Queue(QueueSlot),
    SortRanks,
    SortTable,
    Samples,
    Accumulation,
}

/// A single device dispatch (or a barrier between them).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Clears the accumulation buffers and the accumulated-samples counter.
    ResetAccumulation,

    /// Header kernel: `active = [pixel_count, 0]`, `ping_pong = 0`.
    BeginSample,

    /// Full-grid kernel writing one ray per pixel into queue A.
    GeneratePrimary(RayPassParams),

    /// Sort, pass 1: per-tile ranks and bucket totals of given queue.
    SortScanGroups { queue: QueueSlot },

    /// Sort, pass 2: exclusive scan of the bucket totals.
    SortScanSums,

    /// Sort, pass 3: scatters given queue into the other one.
    SortScatter { queue: QueueSlot },

    /// Moves sorted rays from the other queue back into given one.
    SortCopyBack { queue: QueueSlot },

    /// Header kernel: clears the target queue, writes indirect arguments.
    BeginBounce,

    /// Indirectly-dispatched kernel consuming given queue and appending
    /// survivors into the other one.
    TraceBounce {
        params: RayPassParams,
        queue: QueueSlot,
    },

    /// Header kernel: flips `ping_pong`.
    EndBounce,

    /// Full-grid kernel folding per-sample contributions into the
    /// accumulation buffers.
    Accumulate(AccumulatePassParams),

    /// Header kernel: `accumulated_samples += 1`.
    EndSample,

    /// Makes all writes of preceding steps visible to the following ones.
    Barrier,
}

impl Step {
    pub fn reads(&self) -> Vec<Resource> {
        match *self {
            Step::SortScanGroups { queue } => {
                vec![Resource::Header, Resource::Queue(queue)]
            }

            Step::SortScatter { queue } => vec![
                Resource::Header,
                Resource::Queue(queue),
                Resource::SortRanks,
                Resource::SortTable,
            ],

            Step::SortCopyBack { queue } => {
                vec![Resource::Header, Resource::Queue(queue.other())]
            }

            Step::TraceBounce { queue, .. } => {
                vec![Resource::Header, Resource::Queue(queue)]
            }

            Step::Accumulate(_) => vec![Resource::Samples],

            _ => Default::default(),
        }
    }

    pub fn writes(&self) -> Vec<Resource> {
        match *self {
            Step::ResetAccumulation => {
                vec![Resource::Header, Resource::Accumulation]
            }

            Step::BeginSample
            | Step::BeginBounce
            | Step::EndBounce
            | Step::EndSample => vec![Resource::Header],

            Step::GeneratePrimary(_) => vec![
                Resource::Header,
                Resource::Queue(QueueSlot::A),
                Resource::Samples,
            ],

            Step::SortScanGroups { .. } => {
                vec![Resource::SortRanks, Resource::SortTable]
            }

            Step::SortScanSums => vec![Resource::SortTable],

            Step::SortScatter { queue } => {
                vec![Resource::Queue(queue.other())]
            }

            Step::SortCopyBack { queue } => vec![Resource::Queue(queue)],

            Step::TraceBounce { queue, .. } => vec![
                Resource::Header,
                Resource::Queue(queue.other()),
                Resource::Samples,
            ],

            Step::Accumulate(_) => {
                vec![Resource::Samples, Resource::Accumulation]
            }

            Step::Barrier => Default::default(),
        }
    }

    /// Returns the resource through which `self` and a later step `next`
    /// depend on each other, if any.
    fn conflict(&self, next: &Step) -> Option<Resource> {
        let (reads, writes) = (self.reads(), self.writes());
        let (next_reads, next_writes) = (next.reads(), next.writes());

        writes
            .iter()
            .find(|res| next_reads.contains(res) || next_writes.contains(res))
            .or_else(|| reads.iter().find(|res| next_writes.contains(res)))
            .copied()
    }
}

/// Two dependent steps not separated by a barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error(
    "step #{later} ({later_step:?}) depends on step #{earlier} \
     ({earlier_step:?}) through {resource:?}, but there's no barrier between \
     them"
)]
pub struct Hazard {
    pub earlier: usize,
    pub earlier_step: Step,
    pub later: usize,
    pub later_step: Step,
    pub resource: Resource,
}

/// Ordered stream of dispatches recorded for the device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    steps: Vec<Step>,
}

impl Schedule {
    /// Creates a schedule out of given steps as-is, without inserting any
    /// barriers.
    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Records all of the steps of a single sample.
    pub fn sample(
        layout: &TracerLayout,
        config: &TracerConfig,
        seed: u32,
        reset: bool,
    ) -> Self {
        let mut this = Self::default();
        let flags = config.flags();
        let depth = config.effective_ray_depth();
        let sort = config.ray_sort && layout.sort.is_some();

        let ray_params = |bounce: u32| RayPassParams {
            seed,
            bounce,
            flags: if bounce + 1 == depth {
                flags | PassFlags::LAST_BOUNCE
            } else {
                flags
            },
            pixel_count: layout.pixel_count,
        };

        if reset {
            this.push(Step::ResetAccumulation);
        }

        this.push(Step::BeginSample);
        this.push(Step::GeneratePrimary(ray_params(0)));

        for bounce in 1..depth {
            let queue = QueueSlot::from_index((bounce - 1) as usize);

            if sort {
                this.push(Step::SortScanGroups { queue });
                this.push(Step::SortScanSums);
                this.push(Step::SortScatter { queue });
                this.push(Step::SortCopyBack { queue });
            }

            this.push(Step::BeginBounce);

            this.push(Step::TraceBounce {
                params: ray_params(bounce),
                queue,
            });

            this.push(Step::EndBounce);
        }

        this.push(Step::Accumulate(AccumulatePassParams {
            flags,
            pixel_count: layout.pixel_count,
            _pad: Default::default(),
        }));

        this.push(Step::EndSample);
        this
    }

    /// Appends given step, preceding it with a barrier if it depends on
    /// anything recorded since the last one.
    pub fn push(&mut self, step: Step) {
        if step != Step::Barrier
            && self.segment().any(|(_, prev)| prev.conflict(&step).is_some())
        {
            self.steps.push(Step::Barrier);
        }

        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns steps that are actual dispatches (i.e. skips barriers).
    pub fn dispatches(&self) -> impl Iterator<Item = &Step> + '_ {
        self.steps.iter().filter(|step| **step != Step::Barrier)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that every pair of dependent steps is separated by a barrier.
    pub fn validate(&self) -> Result<(), Hazard> {
        let mut segment_start = 0;

        for (later, later_step) in self.steps.iter().enumerate() {
            if *later_step == Step::Barrier {
                segment_start = later + 1;
                continue;
            }

            for (earlier, earlier_step) in
                self.steps[segment_start..later].iter().enumerate()
            {
                if let Some(resource) = earlier_step.conflict(later_step) {
                    return Err(Hazard {
                        earlier: segment_start + earlier,
                        earlier_step: *earlier_step,
                        later,
                        later_step: *later_step,
                        resource,
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns steps recorded since the last barrier.
    fn segment(&self) -> impl Iterator<Item = (usize, &Step)> + '_ {
        let start = self
            .steps
            .iter()
            .rposition(|step| *step == Step::Barrier)
            .map_or(0, |idx| idx + 1);

        self.steps.iter().enumerate().skip(start)
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec2;

    use super::*;

    fn layout(config: &TracerConfig) -> TracerLayout {
        TracerLayout::new(uvec2(64, 64), config).unwrap()
    }

    fn traced_queues(schedule: &Schedule) -> Vec<QueueSlot> {
        schedule
            .dispatches()
            .filter_map(|step| match step {
                Step::TraceBounce { queue, .. } => Some(*queue),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sample() {
        let config = TracerConfig {
            ray_depth: 3,
            ..Default::default()
        };

        let target = Schedule::sample(&layout(&config), &config, 123, false);

        assert!(target.validate().is_ok());
        assert_eq!(vec![QueueSlot::A, QueueSlot::B], traced_queues(&target));

        let dispatches: Vec<_> = target.dispatches().copied().collect();

        assert_eq!(Step::BeginSample, dispatches[0]);
        assert!(matches!(dispatches[1], Step::GeneratePrimary(_)));
        assert!(matches!(dispatches[8], Step::Accumulate(_)));
        assert_eq!(Step::EndSample, dispatches[9]);
        assert_eq!(10, dispatches.len());

        // Almost every step touches the header; only the accumulation can
        // share a segment with the preceding `EndBounce`
        assert_eq!(18, target.len());
    }

    #[test]
    fn sample_flags_last_bounce() {
        let config = TracerConfig {
            ray_depth: 3,
            ..Default::default()
        };

        let target = Schedule::sample(&layout(&config), &config, 0, false);

        let last_bounces: Vec<_> = target
            .dispatches()
            .filter_map(|step| match step {
                Step::GeneratePrimary(params)
                | Step::TraceBounce { params, .. } => {
                    Some(params.is_last_bounce())
                }
                _ => None,
            })
            .collect();

        assert_eq!(vec![false, false, true], last_bounces);
    }

    #[test]
    fn sample_with_reset_and_sort() {
        let config = TracerConfig {
            ray_depth: 2,
            ray_sort: true,
            ..Default::default()
        };

        let target = Schedule::sample(&layout(&config), &config, 0, true);

        assert!(target.validate().is_ok());

        let dispatches: Vec<_> = target.dispatches().copied().collect();

        assert_eq!(Step::ResetAccumulation, dispatches[0]);

        assert_eq!(
            &[
                Step::SortScanGroups {
                    queue: QueueSlot::A
                },
                Step::SortScanSums,
                Step::SortScatter {
                    queue: QueueSlot::A
                },
                Step::SortCopyBack {
                    queue: QueueSlot::A
                },
                Step::BeginBounce,
            ],
            &dispatches[3..8],
        );
    }

    #[test]
    fn primary_only() {
        let config = TracerConfig {
            ray_depth: 1,
            ray_sort: true,
            ..Default::default()
        };

        let target = Schedule::sample(&layout(&config), &config, 0, false);

        assert!(traced_queues(&target).is_empty());

        assert!(!target
            .dispatches()
            .any(|step| matches!(step, Step::SortScanGroups { .. })));

        assert!(target.dispatches().any(|step| matches!(
            step,
            Step::GeneratePrimary(params) if params.is_last_bounce()
        )));
    }

    #[test]
    fn push_inserts_barriers_only_when_needed() {
        let mut target = Schedule::default();

        target.push(Step::SortScanSums);

        target.push(Step::TraceBounce {
            params: Default::default(),
            queue: QueueSlot::A,
        });

        assert_eq!(2, target.len());

        // Reading queue B right after it's been written needs a barrier
        target.push(Step::SortScanGroups {
            queue: QueueSlot::B,
        });

        assert_eq!(Step::Barrier, target.steps()[2]);
        assert!(target.validate().is_ok());
    }

    #[test]
    fn validate_detects_missing_barrier() {
        let target = Schedule::from_steps([
            Step::BeginSample,
            Step::Barrier,
            Step::BeginBounce,
            Step::TraceBounce {
                params: Default::default(),
                queue: QueueSlot::A,
            },
        ]);

        let hazard = target.validate().unwrap_err();

        assert_eq!(2, hazard.earlier);
        assert_eq!(3, hazard.later);
        assert_eq!(Resource::Header, hazard.resource);
    }

    #[test]
    fn validate_detects_read_after_write() {
        let target = Schedule::from_steps([
            Step::SortScatter {
                queue: QueueSlot::A,
            },
            Step::Barrier,
            Step::SortScanGroups {
                queue: QueueSlot::B,
            },
            Step::SortScatter {
                queue: QueueSlot::B,
            },
        ]);

        let hazard = target.validate().unwrap_err();

        assert_eq!(Resource::SortRanks, hazard.resource);
    }

    #[test]
    fn queue_slots() {
        assert_eq!(QueueSlot::A, QueueSlot::from_index(0));
        assert_eq!(QueueSlot::B, QueueSlot::from_index(1));
        assert_eq!(QueueSlot::A, QueueSlot::from_index(2));
        assert_eq!(QueueSlot::A, QueueSlot::B.other());
        assert_eq!(1, QueueSlot::B.index());
    }
}
