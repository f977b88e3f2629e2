pub mod invoker_tests;
pub mod runner_tests;
