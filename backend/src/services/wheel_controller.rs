use shared::shared_wheel_game::{SpinOutcome, SpinOutcomeGenerator, SPIN_DURATION_MS};
use shared::week::{current_week_id, WeekId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::prize_ledger::{PrizeLedger, PrizeRecord, RecordWinError};
use crate::services::spin_session::{SessionStore, SessionStoreError};
use crate::services::winner_notifier::WinnerNotifier;

#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// How long the reels spin before the outcome is revealed.
    pub reveal_delay: Duration,
    /// Cap on the ledger lookup; past it the week counts as already won.
    pub ledger_timeout: Duration,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_millis(u64::from(SPIN_DURATION_MS)),
            ledger_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub enum SpinError {
    /// The user already has a spin resolving.
    AlreadySpinning,
    RateLimited { reset_in: Option<u64> },
    Session(SessionStoreError),
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySpinning => write!(f, "spin already in progress"),
            Self::RateLimited { .. } => write!(f, "spin allowance exhausted"),
            Self::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SpinError {}

#[derive(Debug)]
pub struct SpinResolution {
    pub outcome: SpinOutcome,
    pub is_win: bool,
    pub prize: Option<PrizeRecord>,
    pub remaining_spins: u32,
}

#[derive(Debug)]
pub struct WheelStatus {
    pub remaining_spins: u32,
    pub reset_in_seconds: Option<u64>,
    pub weekly_prize_available: bool,
}

/// Releases the per-user in-flight slot when the spin resolves, however it
/// resolves.
struct SpinGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    user_id: Uuid,
}

impl<'a> SpinGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<Uuid>>, user_id: Uuid) -> Option<Self> {
        if in_flight.lock().unwrap().insert(user_id) {
            Some(Self { in_flight, user_id })
        } else {
            None
        }
    }
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap().remove(&self.user_id);
    }
}

/// Drives one spin end to end: allowance check, outcome draw against the
/// ledger, the cosmetic reveal delay, and the win side effects.
///
/// Every collaborator is handed in at construction; the controller owns no
/// connections of its own.
pub struct WheelController {
    ledger: PrizeLedger,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn WinnerNotifier>,
    generator: SpinOutcomeGenerator,
    config: WheelConfig,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl WheelController {
    pub fn new(
        ledger: PrizeLedger,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn WinnerNotifier>,
        generator: SpinOutcomeGenerator,
        config: WheelConfig,
    ) -> Self {
        Self {
            ledger,
            sessions,
            notifier,
            generator,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn spin(
        &self,
        user: &CurrentUser,
        now: OffsetDateTime,
    ) -> Result<SpinResolution, SpinError> {
        let _guard =
            SpinGuard::acquire(&self.in_flight, user.id).ok_or(SpinError::AlreadySpinning)?;

        let now_ts = now.unix_timestamp();
        let session = self.sessions.load(user.id).await.map_err(SpinError::Session)?;

        if !session.can_spin(now_ts) {
            return Err(SpinError::RateLimited {
                reset_in: session.window_reset_in(now_ts),
            });
        }

        let session = session.record_spin(now_ts);
        self.sessions
            .save(user.id, &session)
            .await
            .map_err(SpinError::Session)?;

        let week_id = current_week_id(now);

        // The reveal delay and the outcome draw run concurrently; the spin
        // resolves only once both are done.
        let reveal = tokio::time::sleep(self.config.reveal_delay);
        let draw = async {
            let week_has_winner = match tokio::time::timeout(
                self.config.ledger_timeout,
                self.ledger.has_winner(&week_id),
            )
            .await
            {
                Ok(answer) => answer,
                Err(_) => {
                    warn!("prize ledger lookup timed out for {}, assuming the week is won", week_id);
                    true
                }
            };
            self.generator.generate(week_has_winner)
        };
        let ((), outcome) = tokio::join!(reveal, draw);

        let prize = self.resolve(user, &week_id, outcome, now).await;

        Ok(SpinResolution {
            outcome,
            is_win: prize.is_some(),
            prize,
            remaining_spins: session.remaining(now_ts),
        })
    }

    /// Applies the win side effects for a finished draw: record the prize,
    /// then tell the operators. A lost race and a ledger fault both resolve
    /// as "no prize", never as a failed spin.
    async fn resolve(
        &self,
        user: &CurrentUser,
        week_id: &WeekId,
        outcome: SpinOutcome,
        at: OffsetDateTime,
    ) -> Option<PrizeRecord> {
        if !outcome.is_win() {
            return None;
        }

        match self.ledger.record_win(week_id, user.id, at).await {
            Ok(record) => {
                info!(
                    "🎡 WHEEL SPIN: {} hit three {:?} and won the prize for {}",
                    user.username, outcome.symbols[0], week_id
                );
                if let Err(e) = self.notifier.notify(user, week_id).await {
                    // Best-effort: the win is already durable.
                    error!("failed to notify operators about {}'s win: {}", user.username, e);
                }
                Some(record)
            }
            Err(RecordWinError::RaceLost) => {
                info!(
                    "🎡 WHEEL SPIN: {} matched three symbols but {} was already won",
                    user.username, week_id
                );
                None
            }
            Err(RecordWinError::Ledger(e)) => {
                error!("failed to record {}'s win for {}: {}", user.username, week_id, e);
                None
            }
        }
    }

    pub async fn status(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<WheelStatus, SpinError> {
        let session = self.sessions.load(user_id).await.map_err(SpinError::Session)?;
        let now_ts = now.unix_timestamp();

        Ok(WheelStatus {
            remaining_spins: session.remaining(now_ts),
            reset_in_seconds: session.window_reset_in(now_ts),
            weekly_prize_available: !self.ledger.has_winner(&current_week_id(now)).await,
        })
    }
}
