//! Bandwidth-to-resolution policy.
//!
//! A pure step function from measured downlink (Mbps) to the maximum
//! resolution a client should be offered. Inputs that make no sense
//! (negative, NaN, infinite) fall back to a conservative 480p.

use crate::media::Resolution;

/// Maximum resolution permitted at the given downlink, in Mbps.
pub fn ceiling_for_bandwidth(mbps: f64) -> Resolution {
    if !mbps.is_finite() || mbps < 0.0 {
        return Resolution::P480;
    }

    if mbps < 2.0 {
        Resolution::P240
    } else if mbps < 5.0 {
        Resolution::P360
    } else if mbps < 8.0 {
        Resolution::P480
    } else if mbps < 12.0 {
        Resolution::P720
    } else {
        Resolution::P1080
    }
}
