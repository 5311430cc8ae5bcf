#![allow(unused_macros)]
use rstest_reuse::template;

// A testing "template" to inject every engine implementation into a test

#[template]
#[rstest]
#[case::clarabel(pps_solver::clarabel::ClarabelEngine::default())]
#[case::osqp(pps_solver::osqp::OsqpEngine::default())]
pub fn all_engines(#[case] engine: impl pps_solver::Engine) -> () {}
