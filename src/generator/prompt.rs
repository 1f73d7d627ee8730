//! Prompt construction for sheet generation requests.
//!
//! The generator is asked for a grid it may or may not honour. The hint sent here only
//! steers it; the real grid is re-derived from the returned sheet.

use serde_json::{Value, json};

use super::SheetRequest;

/// Grid and aspect ratio requested from the generator for a frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutHint {
    pub columns: u32,
    pub rows: u32,
    /// One of the ratios the generation API accepts.
    pub aspect_ratio: &'static str,
}

pub fn layout_hint(frame_count: u32) -> LayoutHint {
    let (columns, rows, aspect_ratio) = match frame_count {
        2 => (2, 1, "16:9"),
        3 => (3, 1, "16:9"),
        4 => (2, 2, "1:1"),
        5 | 6 => (3, 2, "3:2"),
        8 => (4, 2, "16:9"),
        _ => (3, 2, "3:2"),
    };
    LayoutHint {
        columns,
        rows,
        aspect_ratio,
    }
}

fn base_poses(animation: &str) -> &'static [&'static str] {
    match animation {
        "run" => &[
            "right leg forward",
            "pushing off",
            "mid air",
            "left leg forward",
            "pushing off opposite",
            "mid air loop",
        ],
        "idle" => &[
            "neutral stance",
            "slight inhale",
            "chest up",
            "exhale start",
            "settling",
            "back to neutral",
        ],
        "attack" => &[
            "wind up pose",
            "swing start",
            "mid swing",
            "full extend",
            "follow through",
            "recovery",
        ],
        "walk" => &[
            "right step",
            "weight shift",
            "left swing",
            "left step",
            "weight shift",
            "right swing",
        ],
        "jump" => &[
            "crouch",
            "launch up",
            "rising",
            "peak height",
            "descending",
            "landing",
        ],
        "hurt" => &[
            "surprised",
            "leaning back",
            "stumble",
            "recovering",
            "balancing",
            "standing again",
        ],
        "death" => &[
            "off balance",
            "tilting",
            "falling",
            "almost down",
            "on ground",
            "resting",
        ],
        _ => &["pose 1", "pose 2", "pose 3", "pose 4", "pose 5", "pose 6"],
    }
}

/// Numbered pose list, cycling the base poses when more frames are needed.
///
/// `pose_sequence("jump", 3)` is `"3 frame jump: 1-crouch, 2-launch up, 3-rising."`
pub fn pose_sequence(animation: &str, frame_count: u32) -> String {
    let poses = base_poses(animation);
    let listed: Vec<String> = poses
        .iter()
        .cycle()
        .take(frame_count as usize)
        .enumerate()
        .map(|(i, pose)| format!("{}-{}", i + 1, pose))
        .collect();
    format!("{} frame {}: {}.", frame_count, animation, listed.join(", "))
}

/// Wording that keeps combat animations past content moderation.
fn safe_animation_name(animation: &str, structured: bool) -> &str {
    match (animation, structured) {
        ("attack", _) => "action swing",
        ("hurt", false) => "reaction",
        ("hurt", true) => "reaction pose",
        ("death", false) => "falling down",
        ("death", true) => "falling sequence",
        ("hit", _) => "reaction",
        ("fight", false) => "action",
        ("fight", true) => "action sequence",
        (other, _) => other,
    }
}

fn layout_description(hint: LayoutHint, frame_count: u32) -> String {
    if hint.rows == 1 {
        format!("horizontal strip with {} frames side by side", hint.columns)
    } else {
        format!(
            "{} rows, {} columns ({} frames total)",
            hint.rows, hint.columns, frame_count
        )
    }
}

/// Plain text prompt. A refinement switches to the refinement wording.
pub fn text_prompt(req: &SheetRequest) -> String {
    let hint = layout_hint(req.frame_count);
    let poses = pose_sequence(&req.animation, req.frame_count);
    let anim = safe_animation_name(&req.animation, false);
    let layout = layout_description(hint, req.frame_count);

    match &req.refinement {
        None => format!(
            "{style} 2D game sprite sheet for {anim} animation. \
             Show the SAME {subject} character in {n} DIFFERENT POSES arranged in a grid. \
             Layout: {layout}. \
             Each cell shows the FULL BODY character in a different pose. \
             Animation sequence: {poses} \
             SAME character design in every frame, only pose changes. \
             Side view, clean solid background, no text, game sprite style.",
            style = req.style,
            subject = req.prompt,
            n = req.frame_count,
        ),
        Some(refinement) => format!(
            "{style} 2D game sprite sheet for {anim} animation. \
             Character: {subject}. \
             Layout: {layout} grid. \
             Animation sequence: {poses} \
             IMPORTANT REFINEMENTS: {refinement}. \
             Each cell shows FULL BODY of the SAME character in different pose. \
             Consistent character design across all frames. \
             Side view, clean magenta (#FF00FF) background for chroma key, no text.",
            style = req.style,
            subject = req.prompt,
        ),
    }
}

/// Structured prompt document for generators that accept one.
pub fn structured_prompt(req: &SheetRequest) -> Value {
    let hint = layout_hint(req.frame_count);
    let poses = pose_sequence(&req.animation, req.frame_count);
    let anim = safe_animation_name(&req.animation, true);
    let (subject, style, n) = (&req.prompt, &req.style, req.frame_count);

    let mut details = format!("Full body visible in each frame, {}", poses);
    if let Some(refinement) = &req.refinement {
        details.push_str(&format!(" Refinements: {}", refinement));
    }

    json!({
        "short_description": format!("A {style} 2D game sprite sheet showing {n} animation frames of {subject}"),
        "objects": [{
            "description": format!("A {subject} character shown in {n} different {anim} poses"),
            "location": "arranged in a grid pattern filling the entire image",
            "relationship": format!("Same character repeated {n} times in different poses"),
            "relative_size": "each frame takes equal space in the grid",
            "shape_and_color": format!("{style} art style with consistent colors across all frames"),
            "texture": "clean, flat 2D game art texture",
            "appearance_details": details,
        }],
        "background_setting": "Solid magenta (#FF00FF) chroma key background for easy removal",
        "lighting": {
            "conditions": "Flat, even lighting",
            "direction": "Front",
            "shadows": "None or minimal",
        },
        "aesthetics": {
            "composition": format!("Grid layout: {} columns x {} rows", hint.columns, hint.rows),
            "color_scheme": format!("{style} color palette, vibrant and game-ready"),
            "mood_atmosphere": "Dynamic action game character",
        },
        "photographic_characteristics": {
            "camera_angle": "Side view / profile",
            "lens_focal_length": "Standard",
            "depth_of_field": "Flat, no depth blur",
            "focus": "Sharp focus on all frames",
        },
        "style_medium": "digital illustration",
        "context": "2D game sprite sheet for animation",
        "artistic_style": style,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(animation: &str, frame_count: u32) -> SheetRequest {
        SheetRequest {
            prompt: "a knight".to_string(),
            animation: animation.to_string(),
            frame_count,
            style: "anime".to_string(),
            canvas: (128, 128),
            seed: 42,
            refinement: None,
        }
    }

    #[test]
    fn test_layout_hints() {
        assert_eq!(layout_hint(4).aspect_ratio, "1:1");
        assert_eq!((layout_hint(3).columns, layout_hint(3).rows), (3, 1));
        assert_eq!((layout_hint(8).columns, layout_hint(8).rows), (4, 2));
        assert_eq!(layout_hint(12), layout_hint(6));
    }

    #[test]
    fn test_pose_sequence_cycles() {
        assert_eq!(
            pose_sequence("jump", 3),
            "3 frame jump: 1-crouch, 2-launch up, 3-rising."
        );
        let long = pose_sequence("idle", 8);
        assert!(long.contains("7-neutral stance"));
        assert!(long.ends_with("8-slight inhale."));
        assert!(pose_sequence("dance", 2).contains("1-pose 1, 2-pose 2"));
    }

    #[test]
    fn test_text_prompt_uses_safe_names() {
        let prompt = text_prompt(&request("death", 4));
        assert!(prompt.starts_with("anime 2D game sprite sheet for falling down animation."));
        assert!(prompt.contains("2 rows, 2 columns (4 frames total)"));
        assert!(prompt.contains("SAME a knight character"));

        let strip = text_prompt(&request("jump", 3));
        assert!(strip.contains("horizontal strip with 3 frames side by side"));
    }

    #[test]
    fn test_refinement_prompt() {
        let mut req = request("run", 6);
        req.refinement = Some("keep the cape red".to_string());
        let prompt = text_prompt(&req);
        assert!(prompt.contains("IMPORTANT REFINEMENTS: keep the cape red."));
        assert!(prompt.contains("magenta (#FF00FF)"));
    }

    #[test]
    fn test_structured_prompt_shape() {
        let doc = structured_prompt(&request("hurt", 2));
        assert_eq!(doc["artistic_style"], "anime");
        assert_eq!(doc["aesthetics"]["composition"], "Grid layout: 2 columns x 1 rows");
        let description = doc["objects"][0]["description"].as_str().unwrap();
        assert!(description.contains("reaction pose"));
    }
}
