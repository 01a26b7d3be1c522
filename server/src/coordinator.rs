//! Population-wide motion coordination.
//!
//! Every angle query runs a collision pass. A hit stops the whole population,
//! holds it for the cooldown, then restarts every pendulum with one shared
//! `triggered_at`. The scan and the population-wide writes happen under a
//! single transition lock, so at most one stop/cooldown/resume cycle is ever
//! in flight and nobody can trigger off a half-stopped population.

use pendulum_shared::protocol::{PhaseWire, StatusResponse};
use pendulum_shared::{effective_angle, find_collision, CollisionPair, LayoutConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::{ServerConfig, MAX_COOLDOWN_MS};
use crate::error::CoreError;
use crate::store::PendulumStore;

/// Observable population state.
///
/// The stop and resume writes themselves happen under the transition lock, so
/// the short "stopping" and "resuming" steps are never visible from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Running,
    /// Stopped after a collision, restart scheduled at `resume_at_ms`
    Cooldown { resume_at_ms: i64 },
    /// Stopped by an operator, or a post-cooldown restart failed
    Stopped,
}

impl MotionPhase {
    pub fn to_wire(self) -> (PhaseWire, Option<i64>) {
        match self {
            MotionPhase::Running => (PhaseWire::Running, None),
            MotionPhase::Cooldown { resume_at_ms } => (PhaseWire::Cooldown, Some(resume_at_ms)),
            MotionPhase::Stopped => (PhaseWire::Stopped, None),
        }
    }
}

/// Answer to one angle query.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleReading {
    pub id: String,
    pub angle: f64,
    pub moving: bool,
    pub triggered_at: i64,
}

struct Transition {
    phase: MotionPhase,
    /// Bumped whenever a pending resume is superseded
    generation: u64,
    resume_task: Option<JoinHandle<()>>,
}

impl Transition {
    fn cancel_resume(&mut self) {
        self.generation += 1;
        if let Some(task) = self.resume_task.take() {
            task.abort();
        }
    }
}

pub struct MotionCoordinator<S> {
    store: Arc<S>,
    layout: LayoutConfig,
    cooldown: Duration,
    max_id_len: usize,
    clock: Clock,
    transition: Arc<Mutex<Transition>>,
    cycles: Arc<AtomicU64>,
}

impl<S> Clone for MotionCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            layout: self.layout,
            cooldown: self.cooldown,
            max_id_len: self.max_id_len,
            clock: self.clock,
            transition: Arc::clone(&self.transition),
            cycles: Arc::clone(&self.cycles),
        }
    }
}

impl<S: PendulumStore> MotionCoordinator<S> {
    pub fn new(store: Arc<S>, config: &ServerConfig, clock: Clock) -> Self {
        Self {
            store,
            layout: config.layout,
            // Configs that skipped validate() still get a bounded pause
            cooldown: config.cooldown().min(Duration::from_millis(MAX_COOLDOWN_MS)),
            max_id_len: config.max_id_len,
            clock,
            transition: Arc::new(Mutex::new(Transition {
                phase: MotionPhase::Running,
                generation: 0,
                resume_task: None,
            })),
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub async fn phase(&self) -> MotionPhase {
        self.transition.lock().await.phase
    }

    /// Number of collision-triggered stops since start-up.
    pub fn collision_cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> Result<StatusResponse, CoreError> {
        let (phase, resume_at) = self.phase().await.to_wire();
        let pendulums = self.store.members().await?.len();
        Ok(StatusResponse {
            phase,
            resume_at,
            collision_cycles: self.collision_cycles(),
            pendulums,
        })
    }

    /// Handle one "what is pendulum `id`'s angle now" request.
    ///
    /// Runs a collision pass over the whole population first, then answers
    /// from the freshly re-read record, which the pass may have just stopped.
    pub async fn on_query(&self, id: &str) -> Result<AngleReading, CoreError> {
        let id = self.validate_id(id)?;
        if self.store.get(id).await?.is_none() {
            return Err(CoreError::NotFound(id.to_string()));
        }

        self.check_collisions().await?;

        self.angle_of(id)
            .await
            .map_err(|err| match err {
                CoreError::NotFound(id) => CoreError::Vanished(id),
                other => other,
            })
    }

    /// Current angle of one pendulum without running a collision pass.
    pub async fn angle_of(&self, id: &str) -> Result<AngleReading, CoreError> {
        let pendulum = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let angle = effective_angle(&pendulum, self.clock.now_ms())?;
        Ok(AngleReading {
            id: pendulum.id,
            angle,
            moving: pendulum.moving,
            triggered_at: pendulum.triggered_at,
        })
    }

    /// Scan the population and start a stop/cooldown/resume cycle on a hit.
    ///
    /// Returns the colliding pair when this call started a cycle. While a
    /// cooldown is pending no scan runs, so overlapping queries cannot start a
    /// second one.
    pub async fn check_collisions(&self) -> Result<Option<CollisionPair>, CoreError> {
        let mut transition = self.transition.lock().await;
        if matches!(transition.phase, MotionPhase::Cooldown { .. }) {
            return Ok(None);
        }

        let population = self.store.load_all().await?;
        if !population.iter().any(|p| p.moving) {
            return Ok(None);
        }

        let now = self.clock.now_ms();
        let pair = match find_collision(&population, &self.layout, now) {
            Ok(Some(pair)) => pair,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::error!("Collision scan skipped, bad record in population: {}", e);
                return Ok(None);
            }
        };

        tracing::warn!(
            "Collision detected between pendulums {} and {}. dist={:.3}",
            pair.first_id,
            pair.second_id,
            pair.distance
        );

        // All-or-nothing: on failure the population is still running and the
        // next query retries.
        let stopped = self.store.update_all(|p| p.stop()).await?;

        transition.cancel_resume();
        let resume_at_ms = now.saturating_add(self.cooldown_ms());
        transition.phase = MotionPhase::Cooldown { resume_at_ms };
        self.cycles.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "All {} pendulums stopped due to collision, resuming in {} ms",
            stopped.len(),
            self.cooldown.as_millis()
        );

        let generation = transition.generation;
        let deadline = tokio::time::Instant::now() + self.cooldown;
        let this = self.clone();
        transition.resume_task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            this.finish_cooldown(generation).await;
        }));

        Ok(Some(pair))
    }

    async fn finish_cooldown(&self, generation: u64) {
        let mut transition = self.transition.lock().await;
        if transition.generation != generation {
            return;
        }
        transition.resume_task = None;

        let now = self.clock.now_ms();
        match self.store.update_all(|p| p.start(now)).await {
            Ok(resumed) => {
                transition.phase = MotionPhase::Running;
                tracing::info!("All {} pendulums resumed after cooldown", resumed.len());
            }
            Err(e) => {
                transition.phase = MotionPhase::Stopped;
                tracing::error!("Resume after cooldown failed, population stays stopped: {}", e);
            }
        }
    }

    /// Stop every pendulum. Cancels a pending post-collision resume.
    pub async fn stop_all(&self) -> Result<usize, CoreError> {
        let mut transition = self.transition.lock().await;
        let was_cooling_down = matches!(transition.phase, MotionPhase::Cooldown { .. });
        transition.cancel_resume();

        match self.store.update_all(|p| p.stop()).await {
            Ok(stopped) => {
                transition.phase = MotionPhase::Stopped;
                tracing::info!("All {} pendulums stopped by request", stopped.len());
                Ok(stopped.len())
            }
            Err(e) => {
                if was_cooling_down {
                    transition.phase = MotionPhase::Stopped;
                }
                Err(e.into())
            }
        }
    }

    /// Start every pendulum with a fresh shared `triggered_at`. Cancels a pending resume.
    pub async fn start_all(&self) -> Result<usize, CoreError> {
        let mut transition = self.transition.lock().await;
        let was_cooling_down = matches!(transition.phase, MotionPhase::Cooldown { .. });
        transition.cancel_resume();

        let now = self.clock.now_ms();
        match self.store.update_all(|p| p.start(now)).await {
            Ok(started) => {
                transition.phase = MotionPhase::Running;
                tracing::info!("All {} pendulums started by request", started.len());
                Ok(started.len())
            }
            Err(e) => {
                if was_cooling_down {
                    transition.phase = MotionPhase::Stopped;
                }
                Err(e.into())
            }
        }
    }

    /// Drop any pending resume. Records keep whatever state they have.
    pub async fn shutdown(&self) {
        let mut transition = self.transition.lock().await;
        if transition.resume_task.is_some() {
            tracing::warn!("Shutting down mid-cooldown, population stays stopped");
        }
        transition.cancel_resume();
    }

    fn cooldown_ms(&self) -> i64 {
        i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX)
    }

    fn validate_id<'a>(&self, id: &'a str) -> Result<&'a str, CoreError> {
        let id = id.trim();
        if id.is_empty() || id.len() > self.max_id_len || id.chars().any(char::is_control) {
            return Err(CoreError::InvalidId);
        }
        Ok(id)
    }
}
