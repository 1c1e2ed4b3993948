//! Integration tests for the Trigger controller
//!
//! Tests are organized by the story they tell:
//!
//! - `trigger_no_broker`: a Trigger created before its Broker reports the
//!   missing Broker in its conditions

mod helpers;
mod trigger_no_broker;
