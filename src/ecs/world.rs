//! World — owns every piece of mutable scheduler state.
//!
//! A single [`World`] bundles the phase registry, the system arena, every
//! materialized pipeline, the current pipeline, the frame clock, and the
//! worker pool. The current pipeline is effectively a singleton per world;
//! modeled here as a field rather than a process-wide global, with the
//! world threaded explicitly through every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread::ThreadId;

use crate::ecs::clock::FrameClock;
use crate::ecs::entity::{Entity, EntityAllocator};
use crate::ecs::phase::{PhaseId, PhaseRegistry};
use crate::ecs::pipeline::Pipeline;
use crate::ecs::registry::SystemRegistry;
use crate::ecs::system::{SystemBody, SystemDescriptor, SystemQuery};
use crate::ecs::worker::{SequentialWorkerPool, WorkerPool};
use crate::error::{SchedulerError, SchedulerResult};

/// Owns the scheduler state for one ECS world. Not `Clone`, not `Send` —
/// a world belongs to the thread that created it; every public method
/// checks for that (`InvalidFromWorker`).
pub struct World {
    owner_thread: ThreadId,
    allocator: EntityAllocator,
    phases: PhaseRegistry,
    systems: SystemRegistry,
    pipelines: HashMap<Entity, Pipeline>,
    current_pipeline: Option<Entity>,
    worker_pool: Box<dyn WorkerPool>,
    clock: FrameClock,
    in_progress: bool,
    quit_requested: bool,
    /// Held between `frame_begin` and `frame_end`. Always uncontended here —
    /// `guard_from_worker` already confines every call to the owning thread
    /// — but acquiring and releasing it explicitly mirrors the source's
    /// frame_begin/frame_end pairing, and gives an embedder that later adds
    /// real worker threads a lock already in place rather than an implicit
    /// single-thread assumption to unwind.
    world_lock: Mutex<bool>,
}

impl World {
    /// A world with the ten builtin phases pre-registered, a default
    /// pipeline spanning all of them, and a sequential (no background
    /// worker threads) worker pool.
    #[must_use]
    pub fn new() -> Self {
        Self::with_worker_pool(Box::new(SequentialWorkerPool::new()))
    }

    /// A world with a caller-supplied worker pool, for embedders that do
    /// fan execution groups across background threads.
    #[must_use]
    pub fn with_worker_pool(worker_pool: Box<dyn WorkerPool>) -> Self {
        Self::bootstrap(PhaseRegistry::with_builtin_phases(), None, worker_pool)
    }

    /// A world whose phase declaration order and target FPS come from a
    /// loaded [`crate::config::PipelineConfig`], rather than the ten
    /// builtin phases.
    #[must_use]
    pub fn from_config(config: &crate::config::PipelineConfig, worker_pool: Box<dyn WorkerPool>) -> Self {
        let mut phases = PhaseRegistry::new();
        for name in &config.phases {
            phases.register_phase(name);
        }
        Self::bootstrap(phases, config.target_fps, worker_pool)
    }

    fn bootstrap(phases: PhaseRegistry, target_fps: Option<f32>, worker_pool: Box<dyn WorkerPool>) -> Self {
        let mut allocator = EntityAllocator::new();
        let default_pipeline_id = allocator.allocate();
        let mut pipelines = HashMap::new();
        pipelines.insert(default_pipeline_id, Pipeline::new(phases.phase_ids()));

        Self {
            owner_thread: std::thread::current().id(),
            allocator,
            phases,
            systems: SystemRegistry::new(),
            pipelines,
            current_pipeline: Some(default_pipeline_id),
            worker_pool,
            clock: FrameClock::new(target_fps),
            in_progress: false,
            quit_requested: false,
            world_lock: Mutex::new(false),
        }
    }

    fn world_lock_acquire(&self) -> SchedulerResult<()> {
        let mut locked = self.world_lock.lock().unwrap();
        if *locked {
            return Err(SchedulerError::InternalInconsistency(
                "world lock already held entering frame_begin".to_string(),
            ));
        }
        *locked = true;
        Ok(())
    }

    fn world_lock_release(&self) {
        *self.world_lock.lock().unwrap() = false;
    }

    fn guard_from_worker(&self) -> SchedulerResult<()> {
        if std::thread::current().id() != self.owner_thread {
            return Err(SchedulerError::InvalidFromWorker);
        }
        Ok(())
    }

    fn guard_while_iterating(&self) -> SchedulerResult<()> {
        if self.in_progress {
            return Err(SchedulerError::InvalidWhileIterating);
        }
        Ok(())
    }

    /// No-op hook, evaluated at `pipeline_begin` in the source this crate
    /// generalizes. Nothing in this scheduler's scope currently populates
    /// component monitors, so there is nothing to evaluate; kept as an
    /// explicit call site rather than silently dropped, so a future
    /// monitor facility has somewhere to hook in.
    fn eval_component_monitors(&mut self) {}

    /// Register a phase by name (idempotent — see [`PhaseRegistry::register_phase`]).
    pub fn register_phase(&mut self, name: &str) -> PhaseId {
        self.phases.register_phase(name)
    }

    /// Look up a previously registered phase by name.
    #[must_use]
    pub fn phase_by_name(&self, name: &str) -> Option<PhaseId> {
        self.phases.phase_by_name(name)
    }

    /// Materialize a new pipeline over `phases` — it is born the moment
    /// it's created, with `match_count_at_build` unset so its first use
    /// forces a build.
    pub fn create_pipeline(&mut self, phases: impl IntoIterator<Item = PhaseId>) -> Entity {
        let id = self.allocator.allocate();
        self.pipelines.insert(id, Pipeline::new(phases));
        id
    }

    /// Register a system, tagged with `phase`, backed by `query` and
    /// `body`. Newly registered systems start active.
    pub fn register_system(
        &mut self,
        phase: PhaseId,
        query: Box<dyn SystemQuery>,
        body: Box<dyn SystemBody>,
    ) -> SchedulerResult<Entity> {
        self.guard_from_worker()?;
        self.guard_while_iterating()?;
        let id = self.allocator.allocate();
        self.systems.insert(SystemDescriptor::new(id, phase, query, body));
        Ok(id)
    }

    /// Remove a system. A no-op if `id` is not registered.
    pub fn remove_system(&mut self, id: Entity) -> SchedulerResult<()> {
        self.guard_from_worker()?;
        self.guard_while_iterating()?;
        self.systems.remove(id);
        Ok(())
    }

    /// Enable or disable a system by the embedder's own hand, as opposed to
    /// `Inactive` (set only by the Activation Sweep). A disabled system is
    /// invisible to both pipeline queries, unlike an inactive one, which
    /// still occupies a slot in the build query. Errors if `id` is not
    /// registered.
    pub fn set_system_disabled(&mut self, id: Entity, disabled: bool) -> SchedulerResult<()> {
        self.guard_from_worker()?;
        self.guard_while_iterating()?;
        self.systems
            .get_mut(id)
            .ok_or(SchedulerError::InvalidParameter(id))?
            .set_disabled(disabled);
        Ok(())
    }

    /// Rebuild `pipeline`'s plan if its run query's match count has moved.
    /// Returns the resulting group count.
    pub fn pipeline_update(&mut self, pipeline: Entity) -> SchedulerResult<u32> {
        self.guard_from_worker()?;
        let pipeline_ref = self
            .pipelines
            .get_mut(&pipeline)
            .ok_or(SchedulerError::InvalidParameter(pipeline))?;
        pipeline_ref.update(&self.systems, &self.phases)
    }

    /// Unconditionally rebuild `pipeline`'s plan. Returns the resulting
    /// group count.
    pub fn pipeline_begin(&mut self, pipeline: Entity) -> SchedulerResult<u32> {
        self.guard_from_worker()?;
        self.eval_component_monitors();
        let pipeline_ref = self
            .pipelines
            .get_mut(&pipeline)
            .ok_or(SchedulerError::InvalidParameter(pipeline))?;
        pipeline_ref.begin(&self.systems, &self.phases)
    }

    /// No-op, paired with [`World::pipeline_begin`].
    pub fn pipeline_end(&self) {
        if let Some(pipeline_ref) = self.current_pipeline.and_then(|id| self.pipelines.get(&id)) {
            pipeline_ref.end();
        }
    }

    /// Execute one frame of `pipeline` against `delta_time`.
    pub fn pipeline_progress(&mut self, pipeline: Entity, delta_time: f32) -> SchedulerResult<()> {
        self.guard_from_worker()?;
        self.in_progress = true;

        let outcome = match self.pipelines.get_mut(&pipeline) {
            Some(pipeline_ref) => pipeline_ref.progress(
                &mut self.systems,
                &self.phases,
                &mut *self.worker_pool,
                delta_time,
            ),
            None => Err(SchedulerError::InvalidParameter(pipeline)),
        };

        self.in_progress = false;
        outcome
    }

    /// Begin a frame, returning the effective delta time. Acquires the
    /// world lock, released by the matching `frame_end`. If the clock
    /// itself errors, the lock is released before returning — there will be
    /// no matching `frame_end` to do it.
    pub fn frame_begin(&mut self, user_delta: f32) -> SchedulerResult<f32> {
        self.guard_from_worker()?;
        self.world_lock_acquire()?;
        match self.clock.frame_begin(user_delta) {
            Ok(delta) => Ok(delta),
            Err(err) => {
                self.world_lock_release();
                Err(err)
            }
        }
    }

    /// End a frame, throttling to the configured target FPS if one is set.
    /// Releases the world lock `frame_begin` acquired.
    pub fn frame_end(&mut self, delta_time: f32) {
        self.clock.frame_end(delta_time);
        self.world_lock_release();
    }

    /// Run one full tick against the current pipeline: `frame_begin`,
    /// `pipeline_progress`, `frame_end`. Returns whether the caller should
    /// keep ticking (`false` once [`World::quit`] has been called).
    pub fn progress(&mut self, user_delta: f32) -> SchedulerResult<bool> {
        self.guard_from_worker()?;

        let delta_time = self.frame_begin(user_delta)?;

        // frame_end (and the world lock release it performs) must run
        // regardless of how pipeline_progress comes back.
        let pipeline_result = match self.current_pipeline {
            Some(pipeline) => self.pipeline_progress(pipeline, delta_time),
            None => Err(SchedulerError::InternalInconsistency("no pipeline set on this world".to_string())),
        };
        self.frame_end(delta_time);
        pipeline_result?;

        Ok(!self.quit_requested)
    }

    /// Request that the next [`World::progress`] return `false`. Safe to
    /// call mid-frame — unlike every other mutating call here, this one is
    /// not blocked by an in-progress frame, since the whole point is to be
    /// callable from within a running system.
    pub fn quit(&mut self) {
        self.quit_requested = true;
    }

    /// Deactivate every system in the current pipeline's build query whose
    /// query matches zero tables.
    pub fn deactivate_systems(&mut self) -> SchedulerResult<()> {
        self.guard_from_worker()?;
        self.guard_while_iterating()?;
        if let Some(pipeline_ref) = self.current_pipeline.and_then(|id| self.pipelines.get(&id)) {
            pipeline_ref.deactivate_systems(&mut self.systems, &self.phases);
        }
        Ok(())
    }

    /// Make `pipeline` the current pipeline. Errors if `pipeline` was never
    /// created via [`World::create_pipeline`].
    pub fn set_pipeline(&mut self, pipeline: Entity) -> SchedulerResult<()> {
        self.guard_from_worker()?;
        if !self.pipelines.contains_key(&pipeline) {
            return Err(SchedulerError::InvalidParameter(pipeline));
        }
        self.current_pipeline = Some(pipeline);
        Ok(())
    }

    /// The current pipeline, if one is set.
    #[must_use]
    pub const fn get_pipeline(&self) -> Option<Entity> {
        self.current_pipeline
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
