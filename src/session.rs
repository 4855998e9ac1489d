use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::constants::GameRules;
use crate::engine::{GameEngine, StepOutcome};
use crate::error::SessionError;
use crate::server_protocol::{ErrorReason, ServerMessage};
use crate::server_utils::{random_seed, sanitize_name};
use crate::types::{slot_index, SessionPhase, Slot, SLOTS};

pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub type ClientId = String;

#[derive(Clone, Debug)]
pub enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Debug)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    slot: Option<Slot>,
}

#[derive(Clone, Debug)]
struct SlotBinding {
    client_id: ClientId,
    name: String,
}

#[derive(Debug)]
enum MatchState {
    Waiting,
    Active(Box<GameEngine>),
    Ended(Box<GameEngine>),
}

impl MatchState {
    fn engine(&self) -> Option<&GameEngine> {
        match self {
            Self::Waiting => None,
            Self::Active(engine) | Self::Ended(engine) => Some(&**engine),
        }
    }

    fn engine_mut(&mut self) -> Option<&mut GameEngine> {
        match self {
            Self::Waiting => None,
            Self::Active(engine) | Self::Ended(engine) => Some(&mut **engine),
        }
    }

    fn into_engine(self) -> Option<Box<GameEngine>> {
        match self {
            Self::Waiting => None,
            Self::Active(engine) | Self::Ended(engine) => Some(engine),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting { slot: Slot },
    Started { slot: Slot },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Connection was never registered or was already released.
    Unknown,
    /// Connection was open but had not joined.
    Unbound,
    Released { slot: Slot },
}

/// Membership, lifecycle and fan-out for the single two-seat match this
/// process hosts. Every method is one serialized mutation: callers hold the
/// session lock for exactly one call, and outbound traffic is only enqueued.
#[derive(Debug)]
pub struct Session {
    rules: GameRules,
    fixed_seed: Option<u32>,
    clients: HashMap<ClientId, ClientContext>,
    slots: [Option<SlotBinding>; 2],
    state: MatchState,
    pending_release: Vec<ClientId>,
    matches_started: u64,
}

impl Session {
    pub fn new(rules: GameRules, fixed_seed: Option<u32>) -> Self {
        Self {
            rules,
            fixed_seed,
            clients: HashMap::new(),
            slots: [None, None],
            state: MatchState::Waiting,
            pending_release: Vec::new(),
            matches_started: 0,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            MatchState::Waiting => SessionPhase::Waiting,
            MatchState::Active(_) => SessionPhase::Active,
            MatchState::Ended(_) => SessionPhase::Ended,
        }
    }

    pub fn engine(&self) -> Option<&GameEngine> {
        self.state.engine()
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn slot_of(&self, client_id: &str) -> Option<Slot> {
        self.clients.get(client_id).and_then(|ctx| ctx.slot)
    }

    pub fn display_name(&self, slot: Slot) -> Option<&str> {
        slot_index(slot)
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|binding| binding.name.as_str())
    }

    pub fn matches_started(&self) -> u64 {
        self.matches_started
    }

    pub fn connect(&mut self, client_id: &str, tx: mpsc::Sender<OutboundMessage>) {
        debug!(client_id, "connection registered");
        self.clients
            .insert(client_id.to_string(), ClientContext { tx, slot: None });
    }

    /// Binds the connection to the lowest free slot. Filling the second slot
    /// starts a fresh match. A full session answers `error{reason:"full"}`
    /// to the caller only.
    pub fn join(&mut self, client_id: &str, display_name: &str) -> Result<JoinOutcome, SessionError> {
        let result = self.admit(client_id, display_name);
        self.drain_failed_deliveries();
        result
    }

    fn admit(&mut self, client_id: &str, display_name: &str) -> Result<JoinOutcome, SessionError> {
        let Some(context) = self.clients.get(client_id) else {
            return Err(SessionError::InvalidCommand("unknown connection"));
        };
        if context.slot.is_some() {
            return Err(SessionError::InvalidCommand("connection already joined"));
        }

        let Some(idx) = self.slots.iter().position(Option::is_none) else {
            info!(client_id, "join rejected, session full");
            self.send_to(
                client_id,
                &ServerMessage::Error {
                    reason: ErrorReason::Full,
                },
            );
            return Err(SessionError::CapacityExceeded);
        };
        if !matches!(self.state, MatchState::Waiting) {
            return Err(SessionError::InvalidCommand("match in progress"));
        }

        let slot = SLOTS[idx];
        let name = sanitize_name(display_name);
        info!(client_id, slot, name = %name, "participant joined");
        self.slots[idx] = Some(SlotBinding {
            client_id: client_id.to_string(),
            name,
        });
        if let Some(context) = self.clients.get_mut(client_id) {
            context.slot = Some(slot);
        }
        self.send_to(client_id, &ServerMessage::Init { slot });

        if self.bound_count() < SLOTS.len() {
            return Ok(JoinOutcome::Waiting { slot });
        }
        self.start_match();
        Ok(JoinOutcome::Started { slot })
    }

    fn start_match(&mut self) {
        let names = [0, 1].map(|idx| {
            self.slots[idx]
                .as_ref()
                .map(|binding| binding.name.clone())
                .unwrap_or_default()
        });
        let seed = self.fixed_seed.unwrap_or_else(random_seed);
        self.matches_started += 1;
        info!(
            seed,
            matches_started = self.matches_started,
            "match started with 2 participants"
        );
        self.state = MatchState::Active(Box::new(GameEngine::new(
            names,
            self.rules.clone(),
            seed,
        )));
        self.broadcast(&ServerMessage::Start);
    }

    /// Steering command. Applied immediately and fanned out without waiting
    /// for the next tick.
    pub fn move_player(&mut self, client_id: &str, x: f64) -> Result<f64, SessionError> {
        let slot = self
            .slot_of(client_id)
            .ok_or(SessionError::InvalidCommand("connection has not joined"))?;
        let MatchState::Active(engine) = &mut self.state else {
            return Err(SessionError::InvalidCommand("match is not running"));
        };
        let applied = engine.move_player(slot, x)?;
        let snapshot = engine.build_snapshot();
        self.broadcast(&ServerMessage::State(snapshot));
        self.drain_failed_deliveries();
        Ok(applied)
    }

    /// One timer firing. Exactly one step of state advance, never more.
    pub fn tick(&mut self) {
        let stepped = match self.state.engine_mut() {
            None => return,
            Some(engine) => match engine.step() {
                StepOutcome::Terminal => None,
                StepOutcome::Advanced => Some((engine.build_snapshot(), engine.is_over())),
            },
        };

        match stepped {
            None => self.on_terminal(),
            Some((snapshot, over)) => {
                if over {
                    self.mark_ended();
                }
                self.broadcast(&ServerMessage::State(snapshot));
            }
        }
        self.drain_failed_deliveries();
    }

    fn mark_ended(&mut self) {
        let previous = std::mem::replace(&mut self.state, MatchState::Waiting);
        self.state = match previous {
            MatchState::Active(engine) => {
                info!(tick = engine.tick(), "end condition reached");
                MatchState::Ended(engine)
            }
            other => other,
        };
    }

    /// Final broadcast, then a full reset: both seats and names are cleared
    /// and every participant has to join again.
    fn on_terminal(&mut self) {
        let previous = std::mem::replace(&mut self.state, MatchState::Waiting);
        let Some(engine) = previous.into_engine() else {
            return;
        };
        let summary = engine.build_summary();
        info!(
            ticks = summary.ticks,
            winner = ?summary.winner,
            reason = ?summary.reason,
            "match finished"
        );
        self.broadcast(&ServerMessage::State(engine.build_snapshot()));
        self.broadcast(&ServerMessage::GameOver { summary });

        for binding in self.slots.iter_mut() {
            let Some(binding) = binding.take() else {
                continue;
            };
            if let Some(context) = self.clients.get_mut(&binding.client_id) {
                context.slot = None;
            }
        }
    }

    /// Drops the connection. Runs once per connection; later calls are no-ops.
    /// Losing a seat mid-match discards the world and reports
    /// `PrematureDisconnect`; the remaining participant keeps its seat.
    pub fn release(&mut self, client_id: &str) -> Result<ReleaseOutcome, SessionError> {
        let Some(context) = self.clients.remove(client_id) else {
            return Ok(ReleaseOutcome::Unknown);
        };
        let _ = context.tx.try_send(OutboundMessage::Close {
            code: 4000,
            reason: "released".to_string(),
        });
        let Some(slot) = context.slot else {
            debug!(client_id, "unbound connection released");
            return Ok(ReleaseOutcome::Unbound);
        };
        if let Some(idx) = slot_index(slot) {
            self.slots[idx] = None;
        }
        info!(client_id, slot, "participant released");

        if matches!(self.state, MatchState::Waiting) {
            return Ok(ReleaseOutcome::Released { slot });
        }
        self.state = MatchState::Waiting;
        Err(SessionError::PrematureDisconnect { slot })
    }

    /// Answers an undecodable frame.
    pub fn notify_invalid_message(&mut self, client_id: &str) {
        self.send_to(
            client_id,
            &ServerMessage::Error {
                reason: ErrorReason::InvalidMessage,
            },
        );
        self.drain_failed_deliveries();
    }

    fn send_to(&mut self, client_id: &str, message: &ServerMessage) {
        let Some(payload) = encode(message) else {
            return;
        };
        if let Err(err) = self.enqueue(client_id, payload) {
            warn!(%err, "delivery failed");
            self.pending_release.push(client_id.to_string());
        }
    }

    /// Enqueues one payload per seated connection. A failing recipient is
    /// set aside for release; the others still get the message.
    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(payload) = encode(message) else {
            return;
        };
        let recipients: Vec<ClientId> = self
            .slots
            .iter()
            .flatten()
            .map(|binding| binding.client_id.clone())
            .collect();
        for client_id in recipients {
            if let Err(err) = self.enqueue(&client_id, payload.clone()) {
                warn!(%err, "delivery failed");
                self.pending_release.push(client_id);
            }
        }
    }

    fn enqueue(&self, client_id: &str, payload: String) -> Result<(), SessionError> {
        let Some(client) = self.clients.get(client_id) else {
            return Ok(());
        };
        client
            .tx
            .try_send(OutboundMessage::Text(payload))
            .map_err(|_| SessionError::DeliveryFailure {
                client_id: client_id.to_string(),
            })
    }

    fn drain_failed_deliveries(&mut self) {
        while let Some(client_id) = self.pending_release.pop() {
            match self.release(&client_id) {
                Ok(outcome) => debug!(client_id, ?outcome, "released after delivery failure"),
                Err(err) => warn!(client_id, %err, "match reset after delivery failure"),
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(%err, "failed to encode outbound message");
            None
        }
    }
}
