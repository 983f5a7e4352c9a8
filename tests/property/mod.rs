// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module

mod config_validation;
mod distribution_bounds;
