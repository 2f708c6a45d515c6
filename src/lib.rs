// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cli;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod kubernetes;
pub mod poller;
pub mod probe;
pub mod process;
pub mod readiness;
pub mod steps;
pub mod tools;

#[cfg(test)]
pub mod test_utils;
