//! Region detection.
//!
//! Finds candidate widget bounding boxes in a dashboard screenshot. Detection
//! is heuristic (edge/contour based) and intentionally over-produces: several
//! passes run over the same image and their candidates may overlap. A greedy
//! overlap pass keeps the candidate list bounded here; final per-widget
//! deduplication happens in [`crate::resolve`] after text extraction, where
//! recognition confidence is available as a tie-breaker.

use serde::{Deserialize, Serialize};

/// Axis-aligned candidate rectangle in image coordinates, with the detection
/// confidence of the pass that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Intersection-over-Union with another region, in [0,1].
    pub fn iou(&self, other: &Region) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let inter = (x2 - x1) as f32 * (y2 - y1) as f32;
        let a1 = self.area() as f32;
        let a2 = other.area() as f32;
        inter / (a1 + a2 - inter)
    }
}

/// Tunable detection thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Candidates below this area (px²) are treated as noise, not reported.
    pub min_widget_area: u32,
    /// Candidates below this detection confidence are discarded.
    pub confidence_threshold: f32,
    /// IoU above which two rectangles count as duplicates of one widget.
    pub iou_threshold: f32,
    /// Hard cap on the number of candidates handed to extraction.
    pub max_regions: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            min_widget_area: 3000,
            confidence_threshold: 0.3,
            iou_threshold: 0.5,
            max_regions: 15,
        }
    }
}

// Pass confidences. Contour hits are the most reliable, grid cells are a
// layout guess of last resort.
const CONTOUR_CONFIDENCE: f32 = 0.7;
const PANEL_CONFIDENCE: f32 = 0.6;
const GRID_CONFIDENCE: f32 = 0.4;

/// Detect candidate widget regions in a grayscale screenshot.
///
/// Returns an empty set (not an error) when nothing passes the area filter;
/// the caller falls back to whole-image extraction.
pub fn detect_regions(gray: &image::GrayImage, cfg: &DetectConfig) -> Vec<Region> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return vec![];
    }

    let mut candidates = Vec::new();
    candidates.extend(detect_by_contours(gray, cfg));
    candidates.extend(detect_by_panels(gray, cfg));
    candidates.extend(detect_by_grid(w, h, cfg));

    candidates.retain(|r| r.area() >= cfg.min_widget_area as u64 && r.confidence >= cfg.confidence_threshold);

    let mut regions = drop_overlapping(candidates, cfg.iou_threshold);

    // Largest first; the cap keeps pathological screenshots bounded.
    regions.sort_by_key(|r| std::cmp::Reverse(r.area()));
    regions.truncate(cfg.max_regions);

    log::debug!("detected {} candidate widget regions", regions.len());
    regions
}

/// Contour pass: edge map, closed to connect broken panel borders, then
/// outer-contour bounding rects filtered by the aspect ratio typical of
/// dashboard panels.
fn detect_by_contours(gray: &image::GrayImage, cfg: &DetectConfig) -> Vec<Region> {
    use imageproc::distance_transform::Norm;
    use imageproc::edges::canny;
    use imageproc::morphology::close;

    let edges = canny(gray, 30.0, 100.0);
    let closed = close(&edges, Norm::LInf, 1);

    let (w, h) = gray.dimensions();
    let mut regions = Vec::new();

    for rect in contour_bounding_rects(&closed) {
        let (x, y, rw, rh) = rect;
        if (rw as u64) * (rh as u64) < cfg.min_widget_area as u64 {
            continue;
        }

        let aspect = rw as f32 / rh as f32;
        if !(0.5..4.0).contains(&aspect) {
            continue;
        }

        // Pad so panel borders don't clip the title row.
        const PAD: u32 = 10;
        let px = x.saturating_sub(PAD);
        let py = y.saturating_sub(PAD);
        let pw = (rw + 2 * PAD).min(w - px);
        let ph = (rh + 2 * PAD).min(h - py);

        regions.push(Region::new(px, py, pw, ph, CONTOUR_CONFIDENCE));
    }

    regions
}

/// Panel pass: adaptive threshold and a coarse morphological open leave only
/// large solid structures, whose outer contours approximate panel bodies.
fn detect_by_panels(gray: &image::GrayImage, cfg: &DetectConfig) -> Vec<Region> {
    use imageproc::contrast::adaptive_threshold;
    use imageproc::distance_transform::Norm;
    use imageproc::morphology::open;

    let thresh = adaptive_threshold(gray, 7, 10);
    let opened = open(&thresh, Norm::LInf, 10);

    contour_bounding_rects(&opened)
        .into_iter()
        .filter(|&(_, _, rw, rh)| (rw as u64) * (rh as u64) >= cfg.min_widget_area as u64)
        .map(|(x, y, rw, rh)| Region::new(x, y, rw, rh, PANEL_CONFIDENCE))
        .collect()
}

/// Grid pass: dashboards usually lay widgets out in a regular grid, so emit
/// cell rectangles for the common configurations as low-confidence guesses.
fn detect_by_grid(w: u32, h: u32, cfg: &DetectConfig) -> Vec<Region> {
    const GRID_CONFIGS: &[(u32, u32)] = &[
        (2, 2),
        (3, 2),
        (2, 3),
        (3, 3),
        (4, 2),
        (2, 4),
        (4, 3),
        (3, 4),
    ];
    const INSET: u32 = 10;

    let mut regions = Vec::new();
    for &(rows, cols) in GRID_CONFIGS {
        let cell_w = w / cols;
        let cell_h = h / rows;
        if cell_w as u64 * cell_h as u64 <= cfg.min_widget_area as u64 {
            continue;
        }
        if cell_w <= 2 * INSET || cell_h <= 2 * INSET {
            continue;
        }

        for r in 0..rows {
            for c in 0..cols {
                regions.push(Region::new(
                    c * cell_w + INSET,
                    r * cell_h + INSET,
                    cell_w - 2 * INSET,
                    cell_h - 2 * INSET,
                    GRID_CONFIDENCE,
                ));
            }
        }
    }

    regions
}

/// Bounding rectangles of outer contours, as `(x, y, w, h)`.
fn contour_bounding_rects(bin: &image::GrayImage) -> Vec<(u32, u32, u32, u32)> {
    use imageproc::contours::{find_contours, BorderType};

    let mut rects = Vec::new();
    for c in find_contours::<i32>(bin) {
        if c.border_type != BorderType::Outer {
            continue;
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for p in &c.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if min_x < 0 || min_y < 0 || max_x < min_x || max_y < min_y {
            continue;
        }

        rects.push((
            min_x as u32,
            min_y as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ));
    }
    rects
}

/// Greedy overlap filter: walk candidates in descending confidence and keep
/// a candidate only if it does not overlap anything already kept.
fn drop_overlapping(mut candidates: Vec<Region>, iou_threshold: f32) -> Vec<Region> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.area().cmp(&a.area()))
    });

    let mut kept: Vec<Region> = Vec::new();
    for cand in candidates {
        if kept.iter().all(|k| k.iou(&cand) <= iou_threshold) {
            kept.push(cand);
        }
    }
    kept
}
