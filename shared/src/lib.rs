pub mod shared_wheel_game;
pub mod spin_limit;
pub mod week;
