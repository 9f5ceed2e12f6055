//! Request tests: JSON in, SVG or layout JSON out.

use std::ffi::{CStr, CString};
use std::path::PathBuf;

use stavelib::*;

fn output_dir() -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_output");
    std::fs::create_dir_all(&dir).ok();
    dir
}

const TWO_BARS: &str = r##"{
    "surface": { "canvasDivId": "tune", "canvasWidth": 900, "canvasHeight": 160, "scale": 1.0 },
    "bars": [
        {
            "stave": { "x": 10, "y": 50, "width": 400, "hasRightBar": true,
                       "hasDoubleRightBar": false, "barNo": 0 },
            "keySignature": "D",
            "timeSignature": { "numerator": 4, "denominator": 4 },
            "tempo": { "duration": "q", "bpm": 96, "name": "Allegro" },
            "repeat": "begin",
            "beamGroups": [ { "noteCount": 2, "noteKind": 8 } ],
            "vexCurves": [ { "from": 0, "to": 3 } ],
            "musicSpec": {
                "noteSpecs": [
                    { "vexNote": { "keys": ["f#/4"], "duration": "8" }, "graceKeys": ["e/4"] },
                    { "vexNote": { "keys": ["a/4"], "duration": "8" } },
                    { "vexNote": { "keys": ["d/5"], "duration": "8" }, "articulations": ["a."] },
                    { "vexNote": { "keys": ["f#/5"], "duration": "8" }, "ornaments": ["tr"] },
                    { "vexNote": { "keys": ["e/5"], "duration": "q" } },
                    { "vexNote": { "keys": ["e/5"], "duration": "q" } }
                ],
                "tuplets": [],
                "ties": [4]
            }
        },
        {
            "stave": { "x": 410, "y": 50, "width": 300, "hasRightBar": true,
                       "hasDoubleRightBar": false, "barNo": 1 },
            "repeat": "end",
            "volta": { "voltaType": 5, "iteration": 1 },
            "beamGroups": [ { "noteCount": 2, "noteKind": 8 } ],
            "musicSpec": {
                "noteSpecs": [
                    { "vexNote": { "keys": ["d/5"], "duration": "8" } },
                    { "vexNote": { "keys": ["c#/5"], "duration": "8" }, "accidentals": ["#"] },
                    { "vexNote": { "keys": ["b/4"], "duration": "8" } },
                    { "vexNote": { "keys": ["a/4"], "duration": "16" } },
                    { "vexNote": { "keys": ["g/4"], "duration": "16" } },
                    { "vexNote": { "keys": ["f#/4", "a/4", "d/5"], "duration": "h" } }
                ],
                "tuplets": [ { "startPos": 0, "endPos": 3, "p": 3, "q": 2 } ],
                "ties": []
            }
        }
    ]
}"##;

#[test]
fn two_bars_render_onto_one_surface() {
    let svg = render_score_json(TWO_BARS).expect("request should render");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"id="tune""#));
    assert!(svg.contains("Allegro"));
    assert!(svg.contains("= 96"));
    assert!(svg.contains("<ellipse"), "noteheads are ellipses");
    assert!(svg.contains("<path"), "ties and slurs are paths");

    let out = output_dir().join("two_bars.svg");
    std::fs::write(&out, &svg).expect("Failed to write SVG");
}

#[test]
fn layout_json_reports_every_bar() {
    let json = layout_to_json(TWO_BARS).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let bars = value.as_array().expect("one entry per bar");
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0]["positions"].as_array().map(|p| p.len()), Some(6));
    assert_eq!(bars[0]["beams"].as_array().map(|b| b.len()), Some(2));
    assert_eq!(bars[0]["ties"].as_array().map(|t| t.len()), Some(1));
    assert_eq!(bars[0]["curves"].as_array().map(|c| c.len()), Some(1));
    assert_eq!(bars[1]["tuplets"][0]["label"], "3");
    assert_eq!(bars[1]["staveWidth"], 300.0);
}

#[test]
fn request_structs_round_through_the_model() {
    let request = parse_score_request(TWO_BARS).unwrap();
    assert_eq!(request.surface.canvas_div_id, "tune");
    let (stave, measure) = parse_bar(&request.bars[1]).unwrap();
    assert!(!stave.is_system_start());
    assert_eq!(stave.end_barline(), BarlineType::RepeatEnd);
    assert_eq!(stave.volta.map(|v| v.kind), Some(VoltaType::BeginEnd));
    assert_eq!(measure.notes[1].accidentals, vec![Some(Accidental::Sharp)]);
    assert_eq!(measure.notes[5].pitches.len(), 3);
}

#[test]
fn surface_defaults_when_omitted() {
    let json = r#"{ "bars": [ { "stave": { "x": 0, "y": 40, "width": 200, "barNo": 0 } } ] }"#;
    let request = parse_score_request(json).unwrap();
    assert_eq!(request.surface, SurfaceConfig::default());
    let svg = render_score_json(json).unwrap();
    assert!(svg.contains(r#"id="score""#));
}

#[test]
fn bad_tokens_are_config_errors() {
    let json = r#"{ "bars": [ { "stave": { "x": 0, "y": 40, "width": 200, "barNo": 0 },
        "musicSpec": { "noteSpecs": [ { "vexNote": { "keys": ["x/4"], "duration": "q" } } ] } } ] }"#;
    assert_eq!(
        render_score_json(json).unwrap_err(),
        RenderError::Config(ConfigError::InvalidKey("x/4".into()))
    );

    let json = r#"{ "bars": [ { "stave": { "x": 0, "y": 40, "width": 200, "barNo": 0 },
        "keySignature": "H" } ] }"#;
    assert_eq!(
        render_score_json(json).unwrap_err(),
        RenderError::Config(ConfigError::InvalidKeySignature("H".into()))
    );
}

#[test]
fn bad_surface_is_reported() {
    let json = r#"{ "surface": { "canvasDivId": "", "canvasWidth": 100, "canvasHeight": 100, "scale": 1 },
        "bars": [] }"#;
    assert_eq!(
        render_score_json(json).unwrap_err(),
        RenderError::Surface(SurfaceError::MissingTarget)
    );
}

#[test]
fn mismatched_beam_scheme_is_rejected() {
    let json = r#"{ "bars": [ { "stave": { "x": 0, "y": 40, "width": 300, "barNo": 0 },
        "timeSignature": { "numerator": 3, "denominator": 4 },
        "beamGroups": [ { "noteCount": 4, "noteKind": 8 } ] } ] }"#;
    assert!(matches!(
        render_score_json(json),
        Err(RenderError::Config(ConfigError::BeamSchemeMismatch { .. }))
    ));
}

fn one_bar(music: &str, extra: &str) -> String {
    format!(
        r#"{{ "bars": [ {{ "stave": {{ "x": 0, "y": 40, "width": 300, "barNo": 0 }}{}, "musicSpec": {} }} ] }}"#,
        extra, music
    )
}

#[test]
fn out_of_range_numbers_are_config_errors() {
    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/5"], "duration": "q" } },
                             { "vexNote": { "keys": ["c/5"], "duration": "q" } } ],
             "ties": [18446744073709551615] }"#,
        "",
    );
    assert_eq!(
        render_score_json(&json).unwrap_err(),
        RenderError::Config(ConfigError::InvalidRange {
            kind: RangeKind::Tie,
            start: usize::MAX,
            end: usize::MAX,
            len: 2,
        })
    );

    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/5"], "duration": "q" }, "dots": [40] },
                             { "vexNote": { "keys": ["c/5"], "duration": "q" } } ] }"#,
        "",
    );
    assert_eq!(
        render_score_json(&json).unwrap_err(),
        RenderError::Config(ConfigError::TooManyDots { dots: 40, max: MAX_DOTS })
    );

    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/5"], "duration": "8" } },
                             { "vexNote": { "keys": ["c/5"], "duration": "8" } } ],
             "tuplets": [ { "startPos": 0, "endPos": 2, "p": 2000000011, "q": 2000000033 } ] }"#,
        "",
    );
    assert!(matches!(
        render_score_json(&json),
        Err(RenderError::Config(ConfigError::InvalidTupletRatio { .. }))
    ));

    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/400000000"], "duration": "q" } } ] }"#,
        "",
    );
    assert_eq!(
        render_score_json(&json).unwrap_err(),
        RenderError::Config(ConfigError::InvalidKey("c/400000000".into()))
    );

    let json = one_bar(
        r#"{ "noteSpecs": [] }"#,
        r#", "timeSignature": { "numerator": 3000000000, "denominator": 4 }"#,
    );
    assert!(matches!(
        render_score_json(&json),
        Err(RenderError::Config(ConfigError::InvalidTimeSignature { .. }))
    ));
}

#[test]
fn huge_beam_group_without_time_signature_still_renders() {
    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/5"], "duration": "8" } },
                             { "vexNote": { "keys": ["c/5"], "duration": "8" } } ] }"#,
        r#", "beamGroups": [ { "noteCount": 3000000000, "noteKind": 8 } ]"#,
    );
    let value: serde_json::Value = serde_json::from_str(&layout_to_json(&json).unwrap()).unwrap();
    assert_eq!(value[0]["beams"].as_array().map(|b| b.len()), Some(1));
}

#[test]
fn control_characters_in_text_never_reach_the_svg() {
    let json = one_bar(
        r#"{ "noteSpecs": [ { "vexNote": { "keys": ["c/5"], "duration": "q" } } ] }"#,
        r#", "tempo": { "duration": "q", "bpm": 60, "name": "Lento\u0000" }"#,
    );
    let svg = render_score_json(&json).unwrap();
    assert!(svg.contains("Lento"));
    assert!(!svg.contains('\0'));

    let request = CString::new(json).unwrap();
    let ptr = unsafe { stavelib_render_json(request.as_ptr()) };
    assert!(!ptr.is_null());
    let via_ffi = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    unsafe { stavelib_free_string(ptr) };
    assert_eq!(via_ffi, svg);
}

#[test]
fn ffi_round_trip() {
    let request = CString::new(TWO_BARS).unwrap();
    let ptr = unsafe { stavelib_render_json(request.as_ptr()) };
    assert!(!ptr.is_null());
    let svg = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
    assert!(svg.starts_with("<svg"));
    unsafe { stavelib_free_string(ptr) };

    let bad = CString::new("{}").unwrap();
    assert!(unsafe { stavelib_render_json(bad.as_ptr()) }.is_null());
    assert!(unsafe { stavelib_render_json(std::ptr::null()) }.is_null());
}
