// SPDX-FileCopyrightText: 2026 Trellis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample descriptor documents.

/// One core plugin with a `foo=bar` property, one plain plugin without properties.
pub const TWO_PLUGIN_DESCRIPTOR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plugins>
  <plugin name="ShapeMenu" source="js/Plugins/shapemenu.js" core="true">
    <property name="foo" value="bar"/>
  </plugin>
  <plugin name="Undo" source="js/Plugins/undo.js"/>
</plugins>
"#;

/// Truncated in the middle of a plugin element.
pub const TRUNCATED_DESCRIPTOR: &str = r#"<plugins>
  <plugin name="ShapeMenu" source="js/Plugins/shapemenu.js">
    <property name="foo" value="bar"/>
"#;
