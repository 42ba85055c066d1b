//! Database entities for persisted bot state.

pub mod conversations;
