//! Text shared by every generated file.

const LICENSE: &str = r#"/*
 * Copyright Codeplay Software Ltd.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use these files except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
"#;

/// License header of the library under test.
pub fn license() -> &'static str {
    LICENSE
}

/// Warns readers that the file is generated, naming the generator.
pub fn dont_modify_comment(generator: &str) -> String {
    format!(
        "// DO NOT MODIFY BY HAND\n\
         // This file was automatically generated by refgen ({generator} suite).\n\
         // Results calculated using the refgen v{} reference operators.",
        env!("CARGO_PKG_VERSION")
    )
}
