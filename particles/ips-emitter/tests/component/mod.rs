//! Level 2: Component Integration Tests

mod aging;
mod pool;
mod spawning;
