pub mod prize_ledger;
pub mod spin_session;
pub mod wheel_controller;
pub mod winner_notifier;
