//! Tests for MySQL store implementations
