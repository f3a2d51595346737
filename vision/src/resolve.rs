//! Overlap resolution.
//!
//! The detector intentionally over-produces; after extraction the widget set
//! may still hold several readings of one physical panel. Pairs whose source
//! regions exceed the IoU threshold are duplicates: keep the widget whose
//! text block scored higher, break ties by region area (more context
//! captured). Resolution is greedy in descending IoU order, which is fine in
//! this domain because real dashboard panels are visually well separated.

use crate::widget::Widget;

/// Deduplicate widgets whose source regions overlap above `iou_threshold`.
///
/// Preserves detection order of the survivors. Idempotent: running this on
/// an already-resolved set returns it unchanged.
pub fn resolve_overlaps(widgets: Vec<Widget>, iou_threshold: f32) -> Vec<Widget> {
    if widgets.len() < 2 {
        return widgets;
    }

    // All duplicate pairs, most-overlapping first.
    let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
    for i in 0..widgets.len() {
        for j in (i + 1)..widgets.len() {
            let iou = widgets[i].source_region.iou(&widgets[j].source_region);
            if iou > iou_threshold {
                pairs.push((i, j, iou));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut alive = vec![true; widgets.len()];
    for (i, j, _) in pairs {
        if !alive[i] || !alive[j] {
            continue;
        }
        let loser = pick_loser(&widgets[i], &widgets[j], i, j);
        alive[loser] = false;
    }

    widgets
        .into_iter()
        .zip(alive)
        .filter_map(|(w, keep)| keep.then_some(w))
        .collect()
}

/// Index of the widget to discard: lower extraction confidence loses; on
/// equal confidence the smaller region loses.
fn pick_loser(a: &Widget, b: &Widget, ia: usize, ib: usize) -> usize {
    if a.confidence > b.confidence {
        return ib;
    }
    if b.confidence > a.confidence {
        return ia;
    }
    if a.source_region.area() >= b.source_region.area() {
        ib
    } else {
        ia
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Region;
    use crate::widget::{Category, Status, Trend};

    fn widget(region: Region, confidence: f32) -> Widget {
        Widget {
            name: "Test".to_string(),
            category: Category::System,
            current_value: None,
            min: None,
            max: None,
            trend: Trend::Unknown,
            status: Status::Info,
            spike_time: None,
            raw_text: String::new(),
            confidence,
            source_region: region,
            extracted_at: "2026-08-28T00:00:00".to_string(),
        }
    }

    #[test]
    fn higher_confidence_wins_heavy_overlap() {
        // IoU of these two is ~0.8.
        let strong = widget(Region::new(0, 0, 100, 100, 0.7), 0.9);
        let weak = widget(Region::new(0, 10, 100, 100, 0.7), 0.4);
        assert!(strong.source_region.iou(&weak.source_region) > 0.5);

        let resolved = resolve_overlaps(vec![strong, weak], 0.5);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].confidence, 0.9);
    }

    #[test]
    fn equal_confidence_keeps_larger_area() {
        let small = widget(Region::new(0, 0, 100, 100, 0.7), 0.5);
        let large = widget(Region::new(0, 0, 110, 105, 0.7), 0.5);

        let resolved = resolve_overlaps(vec![small.clone(), large.clone()], 0.5);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_region, large.source_region);
    }

    #[test]
    fn disjoint_widgets_all_survive() {
        let a = widget(Region::new(0, 0, 50, 50, 0.7), 0.5);
        let b = widget(Region::new(100, 0, 50, 50, 0.6), 0.5);
        let c = widget(Region::new(0, 100, 50, 50, 0.4), 0.5);

        let resolved = resolve_overlaps(vec![a, b, c], 0.5);
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn resolution_is_idempotent() {
        let a = widget(Region::new(0, 0, 100, 100, 0.7), 0.9);
        let b = widget(Region::new(10, 0, 100, 100, 0.7), 0.4);
        let c = widget(Region::new(300, 300, 100, 100, 0.6), 0.7);

        let once = resolve_overlaps(vec![a, b, c], 0.5);
        let names_once: Vec<_> = once.iter().map(|w| w.source_region).collect();

        let twice = resolve_overlaps(once, 0.5);
        let names_twice: Vec<_> = twice.iter().map(|w| w.source_region).collect();

        assert_eq!(names_once, names_twice);
    }

    #[test]
    fn survivor_order_follows_detection_order() {
        let first = widget(Region::new(0, 0, 50, 50, 0.7), 0.5);
        let second = widget(Region::new(200, 0, 50, 50, 0.6), 0.5);
        let resolved = resolve_overlaps(vec![first, second], 0.5);
        assert_eq!(resolved[0].source_region.x, 0);
        assert_eq!(resolved[1].source_region.x, 200);
    }
}
