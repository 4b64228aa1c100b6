//! # ecs_scheduler
//!
//! A deterministic system pipeline scheduler for an Entity-Component-System
//! runtime. Given a set of registered systems — each a function bound to a
//! query over components — the scheduler orders them into execution groups
//! separated by synchronization merges, then drives one frame of execution
//! per tick while tolerating structural changes that happen mid-frame.
//!
//! The entity/component store, the query engine, and the worker pool are
//! external collaborators; this crate only consumes the interfaces they
//! expose (see [`ecs::system::SystemQuery`], [`ecs::system::SystemBody`],
//! and [`ecs::worker::WorkerPool`]).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ecs_scheduler::ecs::{World, Column, IoKind};
//! use ecs_scheduler::ecs::system::{SystemBody, SystemQuery};
//!
//! struct AlwaysMatches;
//! impl SystemQuery for AlwaysMatches {
//!     fn columns(&self) -> &[Column] { &[] }
//!     fn matches_any_table(&self) -> bool { true }
//! }
//!
//! struct PrintDelta;
//! impl SystemBody for PrintDelta {
//!     fn execute(&mut self, delta_time: f32) {
//!         println!("tick: {delta_time}");
//!     }
//! }
//!
//! let mut world = World::new();
//! let on_update = world.register_phase("OnUpdate");
//! world.register_system(on_update, Box::new(AlwaysMatches), Box::new(PrintDelta)).unwrap();
//! world.progress(1.0 / 60.0).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod foundation;

pub use error::{SchedulerError, SchedulerResult};
