pub mod fake_timer;
