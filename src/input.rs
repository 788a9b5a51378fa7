//! Reading translation files into trees and flat key maps.

pub mod translation;
