//! Reads engine scene (`.tscn`) and resource (`.tres`) text back into the model.
//!
//! Handles both `parent` spellings the serializer can produce as well as files
//! written by the engine itself. Sub-resources are skipped, and property values
//! outside the supported [`Value`] subset are dropped with a warning.

use crate::error::SceneParseError;
use crate::project::{Node, Resource, Scene, SignalConnection, METADATA_PREFIX};
use crate::value::{parse_value, Value};
use indexmap::IndexMap;
use std::collections::HashMap;

/// `[tag key=value ...]` section header.
#[derive(Debug)]
struct Header {
    tag: String,
    attrs: IndexMap<String, String>,
}

impl Header {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn required(&self, key: &str, line: usize) -> Result<&str, SceneParseError> {
        self.attr(key).ok_or_else(|| {
            SceneParseError::new(line, format!("[{}] is missing '{}'", self.tag, key))
        })
    }
}

fn parse_header(text: &str, line: usize) -> Result<Header, SceneParseError> {
    let inner = &text[1..text.len() - 1];
    let mut chars = inner.chars().peekable();

    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        tag.push(c);
        chars.next();
    }
    if tag.is_empty() {
        return Err(SceneParseError::new(line, "empty section header"));
    }

    let mut attrs = IndexMap::new();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            return Err(SceneParseError::new(line, format!("attribute '{}' has no value", key)));
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c) => value.push(c),
                        None => break,
                    },
                    Some(c) => value.push(c),
                    None => {
                        return Err(SceneParseError::new(
                            line,
                            format!("unterminated value for '{}'", key),
                        ))
                    }
                }
            }
        } else {
            let mut depth = 0i32;
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() && depth == 0 {
                    break;
                }
                match c {
                    '(' | '[' => depth += 1,
                    ')' | ']' => depth -= 1,
                    _ => {}
                }
                value.push(c);
                chars.next();
            }
        }
        attrs.insert(key, value);
    }

    Ok(Header { tag, attrs })
}

/// Whether a value is still incomplete at the end of `text`: an unclosed bracket
/// or an open string literal.
fn is_open(text: &str) -> bool {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '(' | '[' | '{' if !in_string => depth += 1,
            ')' | ']' | '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    in_string || depth > 0
}

/// A logical line: a header or a `key = value` assignment that may span
/// several physical lines.
enum Entry {
    Header(Header),
    Property { key: String, raw: String },
}

fn entries(text: &str) -> Result<Vec<(usize, Entry)>, SceneParseError> {
    let mut out = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') {
            if !trimmed.ends_with(']') {
                return Err(SceneParseError::new(line_no, "unterminated section header"));
            }
            out.push((line_no, Entry::Header(parse_header(trimmed, line_no)?)));
            continue;
        }

        let Some((key, value)) = line.trim_start().split_once('=') else {
            return Err(SceneParseError::new(line_no, format!("unexpected line '{}'", trimmed)));
        };
        let mut raw = value.trim_start().to_string();
        if !is_open(&raw) {
            raw.truncate(raw.trim_end().len());
        }
        // continuation lines of an open string are kept verbatim
        while is_open(&raw) {
            match lines.next() {
                Some((_, more)) => {
                    raw.push('\n');
                    raw.push_str(more);
                }
                None => {
                    return Err(SceneParseError::new(line_no, "unterminated value at end of file"))
                }
            }
        }
        out.push((
            line_no,
            Entry::Property {
                key: key.trim().to_string(),
                raw,
            },
        ));
    }

    Ok(out)
}

/// `ExtResource("1")` → `1`.
fn ext_resource_id(raw: &str) -> Option<&str> {
    raw.strip_prefix("ExtResource(")?
        .strip_suffix(')')
        .map(|id| id.trim().trim_matches('"'))
}

/// Maps an exported `res://` path back to the project key it was written from.
fn project_key(res_path: &str, folder: &str, ext: Option<&str>) -> String {
    let path = res_path.strip_prefix("res://").unwrap_or(res_path);
    let path = path.strip_prefix(folder).unwrap_or(path);
    match ext {
        Some(ext) => path.strip_suffix(ext).unwrap_or(path).to_string(),
        None => path.to_string(),
    }
}

enum Section {
    Preamble,
    Node(String),
    Skipped,
}

pub fn parse_scene(path: &str, text: &str) -> Result<Scene, SceneParseError> {
    let mut scene = Scene::new(path);
    // ext_resource id → (type, res path)
    let mut ext: HashMap<String, (String, String)> = HashMap::new();
    // any spelling of a node's path → node id
    let mut paths: HashMap<String, String> = HashMap::new();
    // node id → (root-named path, engine-relative path)
    let mut own_paths: HashMap<String, (String, String)> = HashMap::new();
    let mut section = Section::Preamble;
    let mut saw_header = false;

    for (line, entry) in entries(text)? {
        match entry {
            Entry::Header(header) => {
                section = Section::Skipped;
                match header.tag.as_str() {
                    "gd_scene" => saw_header = true,
                    "ext_resource" => {
                        let id = header.required("id", line)?.to_string();
                        let kind = header.attr("type").unwrap_or("Resource").to_string();
                        let res_path = header.required("path", line)?.to_string();
                        if kind != "Script" {
                            scene
                                .resources
                                .push(project_key(&res_path, "resources/", Some(".tres")));
                        }
                        ext.insert(id, (kind, res_path));
                    }
                    "sub_resource" => {
                        log::debug!("[parser] {}: skipping sub_resource at line {}", path, line);
                    }
                    "node" => {
                        let name = header.required("name", line)?;
                        let node_type = header.attr("type").unwrap_or("Node");

                        let mut id = name.to_string();
                        let mut suffix = 2;
                        while scene.nodes.contains_key(&id) {
                            id = format!("{}{}", name, suffix);
                            suffix += 1;
                        }
                        if id != name {
                            log::debug!(
                                "[parser] {}: renamed duplicate node {} to {}",
                                path,
                                name,
                                id
                            );
                        }

                        let parent = match header.attr("parent") {
                            None => {
                                if scene.root_node_id.is_some() {
                                    return Err(SceneParseError::new(
                                        line,
                                        format!("second root node '{}'", name),
                                    ));
                                }
                                scene.root_node_id = Some(id.clone());
                                own_paths.insert(id.clone(), (id.clone(), ".".to_string()));
                                None
                            }
                            Some(parent_path) => {
                                let parent_id = paths.get(parent_path).cloned().ok_or_else(|| {
                                    SceneParseError::new(
                                        line,
                                        format!("unknown parent path '{}'", parent_path),
                                    )
                                })?;
                                let (named, relative) = own_paths[&parent_id].clone();
                                let relative = if relative == "." {
                                    id.clone()
                                } else {
                                    format!("{}/{}", relative, id)
                                };
                                let named = format!("{}/{}", named, id);
                                own_paths.insert(id.clone(), (named, relative));
                                Some(parent_id)
                            }
                        };

                        let (named, relative) = own_paths[&id].clone();
                        paths.insert(named, id.clone());
                        paths.insert(relative, id.clone());

                        scene.attach(Node::new(&id, node_type, parent.as_deref()));
                        section = Section::Node(id);
                    }
                    "connection" => {
                        let resolve = |key: &str| -> Result<String, SceneParseError> {
                            let raw = header.required(key, line)?;
                            Ok(paths.get(raw).cloned().unwrap_or_else(|| raw.to_string()))
                        };
                        scene.connections.push(SignalConnection {
                            signal: header.required("signal", line)?.to_string(),
                            from: resolve("from")?,
                            to: resolve("to")?,
                            method: header.required("method", line)?.to_string(),
                        });
                    }
                    other => {
                        log::debug!("[parser] {}: ignoring [{}] at line {}", path, other, line);
                    }
                }
            }
            Entry::Property { key, raw } => match &section {
                Section::Node(id) => {
                    let is_root = scene.root_node_id.as_deref() == Some(id.as_str());
                    if is_root && key.starts_with(METADATA_PREFIX) {
                        match parse_value(&raw) {
                            Ok(value) => {
                                scene.metadata.apply_property(&key, &value);
                            }
                            Err(e) => log::warn!(
                                "[parser] {}: dropping {} at line {}: {}",
                                path,
                                key,
                                line,
                                e
                            ),
                        }
                        continue;
                    }
                    let Some(node) = scene.nodes.get_mut(id) else {
                        continue;
                    };
                    if key == "script" {
                        match ext_resource_id(&raw).and_then(|rid| ext.get(rid)) {
                            Some((_, res_path)) => {
                                node.script = Some(project_key(res_path, "scripts/", None));
                            }
                            None => log::warn!(
                                "[parser] {}: node {} has unresolved script {}",
                                path,
                                id,
                                raw
                            ),
                        }
                        continue;
                    }
                    match parse_value(&raw) {
                        Ok(value) => {
                            node.properties.insert(key, value);
                        }
                        Err(e) => log::warn!(
                            "[parser] {}: dropping {}.{} at line {}: {}",
                            path,
                            id,
                            key,
                            line,
                            e
                        ),
                    }
                }
                Section::Skipped => {}
                Section::Preamble => {
                    return Err(SceneParseError::new(
                        line,
                        format!("property '{}' outside of any section", key),
                    ));
                }
            },
        }
    }

    if !saw_header {
        return Err(SceneParseError::new(1, "missing [gd_scene] header"));
    }
    Ok(scene)
}

pub fn parse_resource(path: &str, text: &str) -> Result<Resource, SceneParseError> {
    let mut resource_type: Option<String> = None;
    let mut properties: IndexMap<String, Value> = IndexMap::new();
    let mut in_resource = false;

    for (line, entry) in entries(text)? {
        match entry {
            Entry::Header(header) => {
                in_resource = header.tag == "resource";
                if header.tag == "gd_resource" {
                    resource_type = Some(header.attr("type").unwrap_or("Resource").to_string());
                }
            }
            Entry::Property { key, raw } if in_resource => match parse_value(&raw) {
                Ok(value) => {
                    properties.insert(key, value);
                }
                Err(e) => log::warn!("[parser] {}: dropping {} at line {}: {}", path, key, line, e),
            },
            Entry::Property { .. } => {}
        }
    }

    let resource_type =
        resource_type.ok_or_else(|| SceneParseError::new(1, "missing [gd_resource] header"))?;
    Ok(Resource {
        path: path.to_string(),
        resource_type,
        properties,
    })
}
