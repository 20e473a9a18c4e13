//! The measurement session installed once per document.
//!
//! `DocumentAgent` is the document's single global slot: it owns the
//! capability surface and at most one live session. The driver feeds
//! observer, timer and frame callbacks back in through the `on_*` methods.

use std::collections::{HashMap, HashSet};

use super::control::is_refresh_request;
use super::env::{AgentEnv, FrameId, ListenerId, MediaId, Registration, TimerId, ViewportEvent};
use super::gate::{GateDecision, PostGate};
use super::policy::{AgentPolicy, FRAME_FALLBACK_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    Installed,
    /// A session already existed; it was asked to re-measure instead.
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureOutcome {
    Posted(u32),
    Unchanged,
    Invalid,
    Deferred,
    /// Channel missing or threw; swallowed.
    ChannelFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    Debounce,
    FramePass,
    Fallback,
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPass {
    Frame(FrameId),
    Timer(TimerId),
}

/// Every registration made by the session, released in one sweep on teardown.
#[derive(Debug, Default)]
struct Disposers {
    entries: Vec<Registration>,
}

impl Disposers {
    fn record(&mut self, registration: Registration) {
        self.entries.push(registration);
    }

    /// Drop a registration whose callback already fired or was released.
    fn forget(&mut self, registration: Registration) {
        self.entries.retain(|r| *r != registration);
    }

    fn drain(&mut self) -> Vec<Registration> {
        std::mem::take(&mut self.entries)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug)]
struct SessionState {
    gate: PostGate,
    pending_pass: Option<PendingPass>,
    debounce: Option<TimerId>,
    timers: HashMap<TimerId, TimerPurpose>,
    disposers: Disposers,
    fallback_delay_ms: u32,
    media_in_flight: usize,
    tracked_media: HashSet<MediaId>,
    watching: HashMap<MediaId, ListenerId>,
}

impl SessionState {
    fn new(policy: &AgentPolicy) -> Self {
        Self {
            gate: PostGate::new(policy),
            pending_pass: None,
            debounce: None,
            timers: HashMap::new(),
            disposers: Disposers::default(),
            fallback_delay_ms: policy.fallback_initial_ms,
            media_in_flight: 0,
            tracked_media: HashSet::new(),
            watching: HashMap::new(),
        }
    }
}

pub struct DocumentAgent<E: AgentEnv> {
    env: E,
    policy: AgentPolicy,
    session: Option<SessionState>,
}

impl<E: AgentEnv> DocumentAgent<E> {
    pub fn new(env: E, policy: AgentPolicy) -> Self {
        Self {
            env,
            policy,
            session: None,
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn is_installed(&self) -> bool {
        self.session.is_some()
    }

    pub fn last_posted(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.gate.last_posted())
    }

    pub fn media_in_flight(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.media_in_flight)
    }

    pub fn fallback_delay_ms(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.fallback_delay_ms)
    }

    /// Registrations that teardown would release.
    pub fn live_registrations(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.disposers.len())
    }

    pub fn bootstrap(&mut self) -> Bootstrap {
        if self.session.is_some() {
            self.refresh();
            return Bootstrap::Refreshed;
        }

        self.env.normalize_styles();
        let mut state = SessionState::new(&self.policy);
        let env = &mut self.env;

        let listeners = [env.observe_mutations(), env.observe_resize()]
            .into_iter()
            .chain(ViewportEvent::ALL.map(|event| env.listen_viewport(event)))
            .chain([env.listen_control(), env.listen_unload()])
            .flatten();
        for id in listeners {
            state.disposers.record(Registration::Listener(id));
        }

        arm_timer(env, &mut state, self.policy.fallback_initial_ms, TimerPurpose::Fallback);
        for &offset in &self.policy.forced_remeasure_ms {
            arm_timer(env, &mut state, offset, TimerPurpose::Forced);
        }

        self.session = Some(state);
        self.track_media();
        self.measure_now();
        Bootstrap::Installed
    }

    /// Forget the last posted height and measure immediately, so the current
    /// height reaches the host even when it has not changed.
    pub fn refresh(&mut self) -> Option<MeasureOutcome> {
        self.session.as_mut()?.gate.forget_last_posted();
        self.measure_now()
    }

    pub fn destroy(&mut self) {
        let Some(mut state) = self.session.take() else {
            return;
        };
        for registration in state.disposers.drain() {
            self.env.release(registration);
        }
    }

    pub fn on_unload(&mut self) {
        self.destroy();
    }

    pub fn on_control_message(&mut self, payload: &str) -> Option<MeasureOutcome> {
        if is_refresh_request(payload) {
            self.refresh()
        } else {
            None
        }
    }

    /// A batch of DOM mutations: track new media, then debounce one pass.
    pub fn on_mutations(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.track_media();
        let Self { env, policy, session } = self;
        let Some(state) = session.as_mut() else {
            return;
        };
        if state.debounce.is_some() {
            return;
        }
        let cooldown = policy.mutation_cooldown_ms(state.media_in_flight);
        state.debounce = arm_timer(env, state, cooldown, TimerPurpose::Debounce);
        if state.debounce.is_none() {
            self.schedule_pass();
        }
    }

    pub fn on_resize(&mut self) {
        self.schedule_pass();
    }

    pub fn on_viewport_event(&mut self, _event: ViewportEvent) -> Option<MeasureOutcome> {
        self.measure_now()
    }

    pub fn on_media_settled(&mut self, id: MediaId) -> Option<MeasureOutcome> {
        let state = self.session.as_mut()?;
        let listener = state.watching.remove(&id)?;
        state.disposers.forget(Registration::Listener(listener));
        state.media_in_flight = state.media_in_flight.saturating_sub(1);
        self.env.remove_listener(listener);
        self.measure_now()
    }

    pub fn on_frame(&mut self, id: FrameId) -> Option<MeasureOutcome> {
        let state = self.session.as_mut()?;
        if state.pending_pass != Some(PendingPass::Frame(id)) {
            return None;
        }
        state.pending_pass = None;
        state.disposers.forget(Registration::Frame(id));
        self.measure_now()
    }

    pub fn on_timer(&mut self, id: TimerId) -> Option<MeasureOutcome> {
        let state = self.session.as_mut()?;
        let purpose = state.timers.remove(&id)?;
        state.disposers.forget(Registration::Timer(id));

        match purpose {
            TimerPurpose::Debounce => {
                state.debounce = None;
                self.schedule_pass();
                None
            }
            TimerPurpose::FramePass => {
                state.pending_pass = None;
                self.measure_now()
            }
            TimerPurpose::Fallback => {
                let outcome = self.measure_now();
                let Self { env, policy, session } = self;
                if let Some(state) = session.as_mut() {
                    let next = policy.next_fallback_ms(state.fallback_delay_ms);
                    state.fallback_delay_ms = next;
                    arm_timer(env, state, next, TimerPurpose::Fallback);
                }
                outcome
            }
            TimerPurpose::Forced => self.measure_now(),
        }
    }

    /// Read geometry and post it if the gate lets it through.
    pub fn measure_now(&mut self) -> Option<MeasureOutcome> {
        let state = self.session.as_mut()?;
        let candidate = self.env.geometry().candidate_height();

        let outcome = match state.gate.admit(candidate) {
            GateDecision::Post(height) => match self.env.post_message(&height.to_string()) {
                Ok(()) => {
                    state.gate.mark_posted(height);
                    MeasureOutcome::Posted(height)
                }
                Err(_) => MeasureOutcome::ChannelFailed,
            },
            GateDecision::Duplicate => MeasureOutcome::Unchanged,
            GateDecision::Invalid => MeasureOutcome::Invalid,
            GateDecision::Deferred { .. } => MeasureOutcome::Deferred,
        };

        // Confirmation needs a later reading, never an inline re-measure.
        if outcome == MeasureOutcome::Deferred {
            self.request_pass(false);
        }
        Some(outcome)
    }

    /// Request one coalesced measurement pass on the next frame.
    fn schedule_pass(&mut self) {
        self.request_pass(true);
    }

    fn request_pass(&mut self, inline_fallback: bool) {
        let Some(state) = self.session.as_mut() else {
            return;
        };
        if state.pending_pass.is_some() {
            return;
        }

        if let Some(frame) = self.env.request_frame() {
            state.pending_pass = Some(PendingPass::Frame(frame));
            state.disposers.record(Registration::Frame(frame));
        } else if let Some(timer) = arm_timer(
            &mut self.env,
            state,
            FRAME_FALLBACK_MS,
            TimerPurpose::FramePass,
        ) {
            state.pending_pass = Some(PendingPass::Timer(timer));
        } else if inline_fallback {
            self.measure_now();
        }
    }

    fn track_media(&mut self) {
        let Some(state) = self.session.as_mut() else {
            return;
        };
        for media in self.env.media_elements() {
            if !state.tracked_media.insert(media.id) || media.settled {
                continue;
            }
            if let Some(listener) = self.env.watch_media(media.id) {
                state.watching.insert(media.id, listener);
                state.disposers.record(Registration::Listener(listener));
                state.media_in_flight += 1;
            }
        }
    }
}

fn arm_timer<E: AgentEnv>(
    env: &mut E,
    state: &mut SessionState,
    delay_ms: u32,
    purpose: TimerPurpose,
) -> Option<TimerId> {
    let id = env.set_timer(delay_ms)?;
    state.timers.insert(id, purpose);
    state.disposers.record(Registration::Timer(id));
    Some(id)
}
