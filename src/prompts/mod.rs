//! Prompt module for LLM-based operations.
//!
//! This module provides modular prompt templates for the relevance judgment
//! and translation steps.

pub mod relevance;
pub mod translation;
