// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! This module holds constants/structures that are shared between the handler and on-demand paths

pub(crate) mod configuration;

#[cfg(not(feature = "benchmarking"))]
pub(crate) mod constants;

#[cfg(feature = "benchmarking")]
pub mod constants;
