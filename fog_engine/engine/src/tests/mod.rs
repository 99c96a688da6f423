mod support;

mod decryption_flow;
mod expiry_policy_tests;
