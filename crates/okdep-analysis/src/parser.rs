//! Syntactic extraction of module references.
//!
//! Only the import/export surface is collected; nothing is type-checked.
//! Any parser diagnostic rejects the whole file so the caller can record a
//! fallback instead of trusting a partial reference list.

use std::path::Path;

use okdep_graph::EdgeKind;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportDeclarationSpecifier, ImportExpression, TSImportEqualsDeclaration,
    TSModuleReference,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{path}: {message}")]
    Syntax { path: String, message: String },

    #[error("{path}: unsupported source type")]
    UnsupportedSourceType { path: String },
}

/// One module reference as written in the source.
///
/// `kind` is `static`, `dynamic` or `reexport`; whether the reference only
/// carries types is kept separately and applied during classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedImport {
    pub import_path: String,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
}

impl ParsedImport {
    fn new(import_path: impl Into<String>, kind: EdgeKind, type_only: bool) -> Self {
        Self {
            import_path: import_path.into(),
            kind,
            type_only,
        }
    }

    /// The edge kind after the type-only override.
    pub fn effective_kind(&self) -> EdgeKind {
        if self.type_only {
            EdgeKind::TypeOnly
        } else {
            self.kind
        }
    }
}

/// Parse `source` (named `path`, which selects the dialect) and return its
/// references in source order.
///
/// Plain JavaScript that is not valid as a strict module (legacy octal
/// literals, `with`, and so on) is parsed again as a CommonJS script. A
/// top-level `return` is accepted in every dialect.
pub fn parse_imports(path: &Path, source: &str) -> Result<Vec<ParsedImport>, ParseError> {
    let display = path.display().to_string();
    let source_type = SourceType::from_path(path)
        .map_err(|_| ParseError::UnsupportedSourceType { path: display.clone() })?;

    match collect_imports(source, source_type) {
        Ok(imports) => Ok(imports),
        Err(message) if source_type.is_javascript() && source_type.is_module() => {
            collect_imports(source, source_type.with_script(true)).map_err(|_| {
                ParseError::Syntax {
                    path: display,
                    message,
                }
            })
        }
        Err(message) => Err(ParseError::Syntax {
            path: display,
            message,
        }),
    }
}

/// One parse attempt. Any diagnostic rejects the attempt with its first message.
fn collect_imports(source: &str, source_type: SourceType) -> Result<Vec<ParsedImport>, String> {
    let allocator = Allocator::default();
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let parsed = Parser::new(&allocator, source, source_type)
        .with_options(options)
        .parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(parsed
            .errors
            .first()
            .map(|error| error.to_string())
            .unwrap_or_else(|| "parser aborted".to_string()));
    }

    let mut collector = ImportCollector::default();
    collector.visit_program(&parsed.program);
    Ok(collector.imports)
}

#[derive(Default)]
struct ImportCollector {
    imports: Vec<ParsedImport>,
}

impl ImportCollector {
    fn push(&mut self, import_path: &str, kind: EdgeKind, type_only: bool) {
        let trimmed = import_path.trim();
        if !trimmed.is_empty() {
            self.imports.push(ParsedImport::new(trimmed, kind, type_only));
        }
    }
}

/// A string literal or an expression-free template literal.
fn static_string<'e>(expression: &'e Expression<'_>) -> Option<&'e str> {
    match expression {
        Expression::StringLiteral(literal) => Some(literal.value.as_str()),
        Expression::TemplateLiteral(template) if template.expressions.is_empty() => template
            .quasis
            .first()
            .and_then(|quasi| quasi.value.cooked.as_ref())
            .map(|cooked| cooked.as_str()),
        _ => None,
    }
}

fn is_require_call(call: &CallExpression<'_>) -> bool {
    matches!(&call.callee, Expression::Identifier(ident) if ident.name.as_str() == "require")
}

impl<'a> Visit<'a> for ImportCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        // `import { type A, type B } from` carries nothing at runtime either.
        let all_specifiers_type_only = decl.specifiers.as_ref().is_some_and(|specifiers| {
            !specifiers.is_empty()
                && specifiers.iter().all(|specifier| match specifier {
                    ImportDeclarationSpecifier::ImportSpecifier(named) => {
                        named.import_kind.is_type()
                    }
                    _ => false,
                })
        });
        let type_only = decl.import_kind.is_type() || all_specifiers_type_only;
        self.push(decl.source.value.as_str(), EdgeKind::Static, type_only);
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            let all_specifiers_type_only = !decl.specifiers.is_empty()
                && decl
                    .specifiers
                    .iter()
                    .all(|specifier| specifier.export_kind.is_type());
            let type_only = decl.export_kind.is_type() || all_specifiers_type_only;
            self.push(source.value.as_str(), EdgeKind::Reexport, type_only);
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.push(
            decl.source.value.as_str(),
            EdgeKind::Reexport,
            decl.export_kind.is_type(),
        );
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Some(specifier) = static_string(&expr.source) {
            self.push(specifier, EdgeKind::Dynamic, false);
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if is_require_call(call) && call.arguments.len() == 1 {
            if let Some(Argument::StringLiteral(literal)) = call.arguments.first() {
                self.push(literal.value.as_str(), EdgeKind::Static, false);
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_ts_import_equals_declaration(&mut self, decl: &TSImportEqualsDeclaration<'a>) {
        if let TSModuleReference::ExternalModuleReference(reference) = &decl.module_reference {
            self.push(
                reference.expression.value.as_str(),
                EdgeKind::Static,
                decl.import_kind.is_type(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, source: &str) -> Vec<(String, EdgeKind)> {
        parse_imports(Path::new(name), source)
            .unwrap()
            .into_iter()
            .map(|import| {
                let kind = import.effective_kind();
                (import.import_path, kind)
            })
            .collect()
    }

    #[test]
    fn extracts_static_dynamic_and_reexports() {
        let imports = parse(
            "src/index.ts",
            r#"
            import React from 'react';
            import './side-effect';
            import { helper } from "./utils";
            export { thing } from './thing';
            export * from './all';
            export * as ns from './ns';
            const lazy = () => import('./lazy');
            const computed = import(`./tpl`);
            const dynamicName = import(name);
            "#,
        );

        assert_eq!(
            imports,
            vec![
                ("react".to_string(), EdgeKind::Static),
                ("./side-effect".to_string(), EdgeKind::Static),
                ("./utils".to_string(), EdgeKind::Static),
                ("./thing".to_string(), EdgeKind::Reexport),
                ("./all".to_string(), EdgeKind::Reexport),
                ("./ns".to_string(), EdgeKind::Reexport),
                ("./lazy".to_string(), EdgeKind::Dynamic),
                ("./tpl".to_string(), EdgeKind::Dynamic),
            ]
        );
    }

    #[test]
    fn marks_type_only_references() {
        let imports = parse(
            "src/types.ts",
            r#"
            import type { A } from './a';
            import { type B, type C } from './b';
            import { type D, e } from './d';
            export type { F } from './f';
            export type * from './g';
            import type H = require('./h');
            "#,
        );

        assert_eq!(
            imports,
            vec![
                ("./a".to_string(), EdgeKind::TypeOnly),
                ("./b".to_string(), EdgeKind::TypeOnly),
                ("./d".to_string(), EdgeKind::Static),
                ("./f".to_string(), EdgeKind::TypeOnly),
                ("./g".to_string(), EdgeKind::TypeOnly),
                ("./h".to_string(), EdgeKind::TypeOnly),
            ]
        );
    }

    #[test]
    fn extracts_commonjs_requires() {
        let imports = parse(
            "lib/server.cjs",
            r#"
            const fs = require('fs');
            const local = require('./local');
            const skipped = require(variable);
            const alsoSkipped = require('./a', './b');
            module.exports = { fs, local };
            "#,
        );

        assert_eq!(
            imports,
            vec![
                ("fs".to_string(), EdgeKind::Static),
                ("./local".to_string(), EdgeKind::Static),
            ]
        );
    }

    #[test]
    fn finds_nested_dynamic_imports() {
        let imports = parse(
            "src/routes.tsx",
            r#"
            export function load() {
                return [import('./pages/home'), import('./pages/about')];
            }
            export const App = () => <div>{String(require('./legacy'))}</div>;
            "#,
        );

        assert_eq!(
            imports,
            vec![
                ("./pages/home".to_string(), EdgeKind::Dynamic),
                ("./pages/about".to_string(), EdgeKind::Dynamic),
                ("./legacy".to_string(), EdgeKind::Static),
            ]
        );
    }

    #[test]
    fn sloppy_mode_javascript_keeps_its_requires() {
        let imports = parse(
            "scripts/setup.js",
            "var helper = require('./helper');\nfs.chmodSync('bin/run', 0755);\n",
        );
        assert_eq!(imports, vec![("./helper".to_string(), EdgeKind::Static)]);
    }

    #[test]
    fn top_level_return_is_accepted() {
        let source = "const config = require('./config');\nif (!config.enabled) return;\nmodule.exports = config;\n";

        assert_eq!(
            parse("lib/plugin.cjs", source),
            vec![("./config".to_string(), EdgeKind::Static)]
        );
        assert_eq!(
            parse("lib/plugin.js", source),
            vec![("./config".to_string(), EdgeKind::Static)]
        );
    }

    #[test]
    fn module_syntax_errors_survive_the_script_retry() {
        let result = parse_imports(
            Path::new("src/mixed.js"),
            "import a from './a';\nconst mode = 0755;\n",
        );
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let result = parse_imports(Path::new("broken.ts"), "import { from './x';\nconst = ;");
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn empty_file_has_no_references() {
        assert!(parse_imports(Path::new("empty.js"), "").unwrap().is_empty());
    }

    #[test]
    fn cache_representation_omits_false_type_flag() {
        let import = ParsedImport::new("./a", EdgeKind::Static, false);
        let json = serde_json::to_string(&import).unwrap();
        assert_eq!(json, r#"{"importPath":"./a","kind":"static"}"#);

        let typed: ParsedImport =
            serde_json::from_str(r#"{"importPath":"./t","kind":"static","typeOnly":true}"#)
                .unwrap();
        assert_eq!(typed.effective_kind(), EdgeKind::TypeOnly);
    }
}
