//! Zoom-gated name labels
//!
//! Each frame, on-screen sprites whose tier is unlocked at the current zoom
//! become candidates. Candidates are ranked by tier then distance to the view
//! center, capped, measured, and accepted greedily when their pill does not
//! overlap one already accepted. A per-address alpha map fades labels in and
//! out so the accepted set can churn without popping.

use std::collections::HashMap;

use glam::Vec2;

use super::surface::DrawSurface;
use crate::tuning::LabelTuning;

const PILL_COLOR: &str = "rgba(14, 16, 32, 0.78)";
const NAME_COLOR: &str = "#ffffff";
const HANDLE_COLOR: &str = "#9fd3ff";

/// Screen-space axis-aligned rect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl LabelRect {
    /// Overlap test with `margin` of extra clearance on every side
    pub fn intersects(&self, other: &LabelRect, margin: f32) -> bool {
        self.x - margin < other.x + other.w
            && other.x - margin < self.x + self.w
            && self.y - margin < other.y + other.h
            && other.y - margin < self.y + self.h
    }
}

/// A sprite that may get a label this frame
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub address: String,
    /// Priority class; landmarks use 0
    pub tier: usize,
    /// Screen point the pill sits above (sprite top center)
    pub anchor: Vec2,
    pub name: String,
    pub handle: Option<String>,
}

/// A candidate with its measured pill
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub candidate: LabelCandidate,
    pub rect: LabelRect,
}

/// Whether a sprite's label is unlocked at `zoom` (relative to fit scale)
pub fn eligible(tier: usize, landmark: bool, zoom: f32, tuning: &LabelTuning) -> bool {
    if landmark {
        return zoom >= tuning.landmark_zoom;
    }
    tuning
        .tier_zoom
        .get(tier)
        .is_some_and(|&threshold| zoom >= threshold)
}

/// Candidate budget at `zoom`, scaled by the quality multiplier
pub fn candidate_cap(zoom: f32, tuning: &LabelTuning, multiplier: f32) -> usize {
    let base = tuning
        .candidate_caps
        .iter()
        .filter(|(threshold, _)| zoom >= *threshold)
        .map(|&(_, cap)| cap)
        .next_back()
        .unwrap_or(0);
    (base as f32 * multiplier).round() as usize
}

/// Pill rect for measured text widths
pub fn pill_rect(
    anchor: Vec2,
    name_w: f32,
    handle_w: Option<f32>,
    tuning: &LabelTuning,
) -> LabelRect {
    let lines = if handle_w.is_some() { 2.0 } else { 1.0 };
    let w = name_w.max(handle_w.unwrap_or(0.0)) + tuning.pad_x * 2.0;
    let h = tuning.line_height * lines + tuning.pad_y * 2.0;
    LabelRect {
        x: anchor.x - w * 0.5,
        y: anchor.y - tuning.lift - h,
        w,
        h,
    }
}

/// Rank candidates by (tier, distance to `view_center`) and keep the first `cap`
pub fn rank(candidates: &mut Vec<LabelCandidate>, view_center: Vec2, cap: usize) {
    candidates.sort_by(|a, b| {
        a.tier.cmp(&b.tier).then_with(|| {
            a.anchor
                .distance_squared(view_center)
                .total_cmp(&b.anchor.distance_squared(view_center))
        })
    });
    candidates.truncate(cap);
}

/// Greedy acceptance: keep each label whose rect clears every one kept before it
pub fn select(measured: Vec<PlacedLabel>, margin: f32) -> Vec<PlacedLabel> {
    let mut accepted: Vec<PlacedLabel> = Vec::with_capacity(measured.len());
    for label in measured {
        if accepted.iter().all(|a| !a.rect.intersects(&label.rect, margin)) {
            accepted.push(label);
        }
    }
    accepted
}

#[derive(Debug, Clone)]
struct ShownLabel {
    alpha: f32,
    label: PlacedLabel,
}

/// Persistent label state across frames
#[derive(Debug, Clone, Default)]
pub struct LabelLayer {
    shown: HashMap<String, ShownLabel>,
}

impl LabelLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current alpha of the label for `address` (0 if not shown)
    pub fn alpha(&self, address: &str) -> f32 {
        self.shown.get(address).map_or(0.0, |s| s.alpha)
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }

    pub fn clear(&mut self) {
        self.shown.clear();
    }

    /// Measure, select and fade. Returns the number of labels accepted this frame.
    pub fn update<S: DrawSurface>(
        &mut self,
        surface: &mut S,
        mut candidates: Vec<LabelCandidate>,
        view_center: Vec2,
        cap: usize,
        tuning: &LabelTuning,
    ) -> usize {
        rank(&mut candidates, view_center, cap);

        let measured: Vec<PlacedLabel> = candidates
            .into_iter()
            .map(|candidate| {
                surface.set_font(&tuning.font);
                let name_w = surface.measure_text(&candidate.name);
                let handle_w = candidate.handle.as_deref().map(|h| {
                    surface.set_font(&tuning.handle_font);
                    surface.measure_text(h)
                });
                let rect = pill_rect(candidate.anchor, name_w, handle_w, tuning);
                PlacedLabel { candidate, rect }
            })
            .collect();

        let accepted = select(measured, tuning.margin);
        let count = accepted.len();
        self.fade(accepted, tuning);
        count
    }

    /// Raise accepted labels toward 1, lower the rest toward 0 and drop them at 0
    fn fade(&mut self, accepted: Vec<PlacedLabel>, tuning: &LabelTuning) {
        let mut next: HashMap<String, ShownLabel> = HashMap::with_capacity(accepted.len());
        for label in accepted {
            let address = label.candidate.address.clone();
            let alpha = (self.alpha(&address) + tuning.fade_in).min(1.0);
            next.insert(address, ShownLabel { alpha, label });
        }
        for (address, mut shown) in self.shown.drain() {
            if next.contains_key(&address) {
                continue;
            }
            shown.alpha -= tuning.fade_out;
            if shown.alpha > 0.0 {
                next.insert(address, shown);
            }
        }
        self.shown = next;
    }

    /// Draw every visible label at its current alpha
    pub fn draw<S: DrawSurface>(&self, surface: &mut S, tuning: &LabelTuning) {
        let mut labels: Vec<&ShownLabel> = self.shown.values().collect();
        // Stable paint order so overlapping fade-outs do not flicker
        labels.sort_by(|a, b| a.label.candidate.address.cmp(&b.label.candidate.address));

        for shown in labels {
            let rect = shown.label.rect;
            let candidate = &shown.label.candidate;
            surface.set_alpha(shown.alpha);
            let radius = rect.h.min(18.0) * 0.5;
            surface.fill_round_rect(rect.x, rect.y, rect.w, rect.h, radius, PILL_COLOR);

            let cx = rect.x + rect.w * 0.5;
            let first = rect.y + tuning.pad_y + tuning.line_height * 0.5;
            surface.set_font(&tuning.font);
            surface.fill_text(&candidate.name, cx, first, NAME_COLOR);
            if let Some(handle) = candidate.handle.as_deref() {
                surface.set_font(&tuning.handle_font);
                surface.fill_text(handle, cx, first + tuning.line_height, HANDLE_COLOR);
            }
        }
        surface.set_alpha(1.0);
    }
}
