//! blocktree editing engine as a WASM module for browser hosts.
//!
//! Every value crosses the boundary as a JSON string. Responses carry a
//! `status` tag: `"ok"` with a payload, or `"error"` with a message.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { BlockEditor } from 'blocktree-wasm';
//!
//! await init();
//!
//! const editor = new BlockEditor(treeJson, envJson, "{}");
//! editor.begin_drag("drag-1", templateJson, "palette");
//! const candidate = JSON.parse(editor.pointer_move(moveJson));
//! // { status: "ok", value: { node: {...}, target: {...}, valid: true, revision: 0 } }
//! const outcome = JSON.parse(editor.drop("drag-1"));
//! ```

use blocktree_checker::OuterStaticEnv;
use blocktree_editor::{DragId, DragOrigin, EditError, Editor, PointerMove, ResolverConfig};
use blocktree_types::{Literal, NodeId, NodeRef};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ══════════════════════════════════════════════════════════════════════════════
// Responses
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response<T: Serialize> {
    Ok { value: T },
    Error { message: String },
}

fn respond<T: Serialize>(result: Result<T, String>) -> String {
    let response = match result {
        Ok(value) => Response::Ok { value },
        Err(message) => Response::Error { message },
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"status":"error","message":"Serialization error: {}"}}"#,
            e
        )
    })
}

fn parse<T: serde::de::DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid {what}: {e}"))
}

fn edit_error(e: EditError) -> String {
    e.to_string()
}

fn parse_origin(origin: &str) -> Result<DragOrigin, String> {
    match origin {
        "palette" => Ok(DragOrigin::Palette),
        "tree" => Ok(DragOrigin::Tree),
        other => Err(format!("unknown drag origin '{other}'")),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Free functions
// ══════════════════════════════════════════════════════════════════════════════

/// Analyze a tree against an environment without starting a session.
///
/// Returns `{ status: "ok", value: Analysis }`.
#[wasm_bindgen]
pub fn analyze(tree_json: &str, env_json: &str) -> String {
    respond((|| {
        let tree: NodeRef = parse("tree", tree_json)?;
        let env: OuterStaticEnv = parse("environment", env_json)?;
        Ok(blocktree_checker::analyze(&tree, &env))
    })())
}

/// Return the engine version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ══════════════════════════════════════════════════════════════════════════════
// BlockEditor
// ══════════════════════════════════════════════════════════════════════════════

/// A browser-side editing session.
#[wasm_bindgen]
pub struct BlockEditor {
    inner: Editor,
}

#[wasm_bindgen]
impl BlockEditor {
    /// `config_json` may be `"{}"` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(tree_json: &str, env_json: &str, config_json: &str) -> Result<BlockEditor, JsValue> {
        Self::create(tree_json, env_json, config_json).map_err(|e| JsValue::from_str(&e))
    }

    pub fn tree(&self) -> String {
        respond(Ok(self.inner.tree()))
    }

    pub fn analysis(&self) -> String {
        respond(Ok(self.inner.analysis()))
    }

    pub fn revision(&self) -> f64 {
        self.inner.revision() as f64
    }

    /// `origin` is `"palette"` or `"tree"`.
    pub fn begin_drag(&mut self, drag_id: &str, payload_json: &str, origin: &str) -> String {
        respond((|| {
            let payload: NodeRef = parse("payload", payload_json)?;
            let origin = parse_origin(origin)?;
            self.inner
                .begin_drag(DragId::from(drag_id), payload, origin)
                .map_err(edit_error)
        })())
    }

    /// Returns the candidate, or `null` when there is none.
    pub fn pointer_move(&mut self, move_json: &str) -> String {
        respond((|| {
            let event: PointerMove = parse("pointer move", move_json)?;
            self.inner
                .pointer_move(&event)
                .map(|c| c.cloned())
                .map_err(edit_error)
        })())
    }

    pub fn potential_drop(&self, drag_id: &str) -> String {
        respond(Ok(self.inner.potential_drop(&DragId::from(drag_id))))
    }

    pub fn drop(&mut self, drag_id: &str) -> String {
        respond(self.inner.drop(&DragId::from(drag_id)).map_err(edit_error))
    }

    pub fn cancel(&mut self, drag_id: &str) -> String {
        respond(self.inner.cancel(&DragId::from(drag_id)).map_err(edit_error))
    }

    pub fn set_literal(&mut self, node_id: &str, literal_json: &str) -> String {
        respond((|| {
            let value: Literal = parse("literal", literal_json)?;
            self.inner
                .set_literal(&NodeId::from(node_id), value)
                .map_err(edit_error)
        })())
    }
}

impl BlockEditor {
    fn create(tree_json: &str, env_json: &str, config_json: &str) -> Result<BlockEditor, String> {
        let tree: NodeRef = parse("tree", tree_json)?;
        let env: OuterStaticEnv = parse("environment", env_json)?;
        let config = ResolverConfig::from_json(config_json).map_err(edit_error)?;
        Ok(BlockEditor {
            inner: Editor::with_config(tree, env, config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: &str = r#"{
        "types": { "moveSpeed": { "kind": "num" } },
        "names": { "moveSpeed": "move speed" },
        "named_returns": ["moveSpeed"]
    }"#;

    const EMPTY: &str = r#"{ "id": "root", "kind": { "type": "program", "decls": [] } }"#;

    const ASSIGN: &str = r#"{
        "id": "tpl",
        "kind": {
            "type": "eq",
            "lhs": { "id": "tpl.lhs", "kind": { "type": "var_ref", "target": "moveSpeed" } },
            "rhs": { "id": "tpl.rhs", "kind": { "type": "literal", "value": { "kind": "num", "value": 5.0 } } }
        }
    }"#;

    fn json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn analyze_reports_ok() {
        let out = json(&analyze(EMPTY, ENV));
        assert_eq!(out["status"], "ok");
        assert_eq!(out["value"]["errors"], json("{}"));
    }

    #[test]
    fn analyze_reports_bad_input() {
        let out = json(&analyze("{", ENV));
        assert_eq!(out["status"], "error");
        assert!(out["message"].as_str().unwrap().starts_with("invalid tree"));
    }

    #[test]
    fn full_drag_round_trip() {
        let mut editor = BlockEditor::create(EMPTY, ENV, "{}").unwrap();
        let out = json(&editor.begin_drag("d", ASSIGN, "palette"));
        assert_eq!(out["status"], "ok");

        let event = r#"{
            "drag_id": "d",
            "position": { "x": 0.0, "y": 500.0 },
            "inside": true,
            "zones": [{
                "kind": { "type": "list_slot", "parent": "root", "index": 0, "line_y": 0.0, "trailing": true },
                "accepts": "decl"
            }]
        }"#;
        let out = json(&editor.pointer_move(event));
        assert_eq!(out["value"]["valid"], true, "{out}");

        let out = json(&editor.drop("d"));
        assert_eq!(out["value"]["outcome"], "committed");
        assert_eq!(editor.revision(), 1.0);
        let tree = json(&editor.tree());
        assert_eq!(tree["value"]["kind"]["decls"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn errors_are_reported_as_json() {
        let mut editor = BlockEditor::create(EMPTY, ENV, "{}").unwrap();
        let out = json(&editor.drop("missing"));
        assert_eq!(out["status"], "error");
        assert_eq!(out["message"], "no active drag with id 'missing'");
        let out = json(&editor.begin_drag("d", ASSIGN, "sideways"));
        assert_eq!(out["message"], "unknown drag origin 'sideways'");
        assert!(BlockEditor::create(EMPTY, ENV, r#"{"max_distance": -1}"#).is_err());
    }
}
