// Business logic services layer
//
// This module contains the relay logic that both the HTTP server and the
// tests drive, independent of how submissions arrive.

pub mod relay;
