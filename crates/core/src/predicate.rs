#![forbid(unsafe_code)]

use crate::filter::FilterState;
use crate::model::Finding;
use crate::taxonomy::INVESTIGATED_DIM;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    /// Investigated finding while the investigated overlay is off.
    HiddenByOverlay,
    /// Non-investigated finding whose dimension is off while the overlay is on.
    HiddenBySoloOverlay,
    HiddenByDimension,
    HiddenByFocus,
}

/// First matching rule wins. Investigated findings answer only to the overlay toggle;
/// everything else answers to its own dimension.
pub fn visibility(finding: &Finding, filter: &FilterState) -> Visibility {
    let overlay_on = filter.is_active(INVESTIGATED_DIM);
    let dim_on = filter.is_active(&finding.dim_id);

    if finding.investigated && !overlay_on {
        return Visibility::HiddenByOverlay;
    }
    if !finding.investigated && overlay_on && !dim_on {
        return Visibility::HiddenBySoloOverlay;
    }
    if !finding.investigated && !dim_on {
        return Visibility::HiddenByDimension;
    }
    if !filter.focus().admits(finding.severity) {
        return Visibility::HiddenByFocus;
    }
    Visibility::Visible
}

pub fn is_visible(finding: &Finding, filter: &FilterState) -> bool {
    visibility(finding, filter) == Visibility::Visible
}
