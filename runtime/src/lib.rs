// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harvest runtime: browser-driven catalog extraction and holdings-file
//! acquisition for ETF providers.
//!
//! The library exposes every stage so integration tests can drive the
//! pipeline through the in-memory renderer.

#![allow(clippy::new_without_default)]

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod extract;
pub mod locator;
pub mod page;
pub mod pipeline;
pub mod providers;
pub mod renderer;
