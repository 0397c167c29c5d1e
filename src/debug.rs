use serde_json::json;

thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records a car-following interaction for the current frame.
pub fn debug_follow(follower: usize, gap: f64, desired_gap: f64, acc: f64) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "follow",
            "follower": follower,
            "gap": gap,
            "desired_gap": desired_gap,
            "acc": acc,
        }))
    })
}

/// Records a collision between two adjacent vehicles for the current frame.
pub fn debug_collision(follower: usize, overlap: f64) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "collision",
            "follower": follower,
            "overlap": overlap,
        }))
    })
}

/// Takes the records collected since the last call.
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
