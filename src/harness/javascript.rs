use serde_json::Value;

use super::{CapturedProgram, MISSING_ENTRY_POINT};

/// Function mode: `input` is bound to the test input, then either the
/// `output` the code assigned or the (possibly async) `solution(input)` result
/// is printed as JSON.
pub fn wrap_function(code: &str, input: &Value, sentinel: &str) -> String {
    format!(
        r#"const input = {input};
{code}
;(async () => {{
  let judgeResult;
  if (typeof output !== 'undefined') {{
    judgeResult = output;
  }} else if (typeof solution === 'function') {{
    judgeResult = await solution(input);
  }} else {{
    process.stderr.write('{missing}\n');
    process.exit(1);
  }}
  process.stdout.write('{sentinel}\n' + JSON.stringify(judgeResult === undefined ? null : judgeResult) + '\n');
}})().catch((err) => {{
  process.stderr.write(String(err && err.stack ? err.stack : err) + '\n');
  process.exit(1);
}});
"#,
        input = input,
        code = code,
        missing = MISSING_ENTRY_POINT.replace('`', ""),
        sentinel = sentinel,
    )
}

/// Full-program mode also exposes the input as a global
pub fn with_global_input(code: &str, input: &Value) -> String {
    format!("globalThis.input = {};\n{}", input, code)
}

/// Buffer everything written through `console.log` or `process.stdout` and
/// emit it after the sentinel when the process exits.
pub fn capture_stdout(source: &str, sentinel: &str) -> CapturedProgram {
    let wrapped = format!(
        r#"const judgeFormat = require('util').format;
const judgeWrite = process.stdout.write.bind(process.stdout);
const judgeChunks = [];
process.stdout.write = (chunk, encoding, callback) => {{
  judgeChunks.push(String(chunk));
  const done = typeof encoding === 'function' ? encoding : callback;
  if (typeof done === 'function') done();
  return true;
}};
console.log = (...args) => {{ judgeChunks.push(judgeFormat(...args) + '\n'); }};
console.info = console.log;
process.on('exit', () => {{
  judgeWrite('{sentinel}\n' + judgeChunks.join(''));
}});
{source}
"#,
        sentinel = sentinel,
        source = source,
    );

    CapturedProgram {
        source: wrapped,
        sentinel: sentinel.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_wrapper_embeds_input_and_code() {
        let source = wrap_function(
            "function solution(input) { return input.a + 1; }",
            &json!({"a": 1, "s": "x'y"}),
            "__MARK__",
        );
        assert!(source.starts_with("const input = {\"a\":1,\"s\":\"x'y\"};\n"));
        assert!(source.contains("function solution(input) { return input.a + 1; }"));
        assert!(source.contains("process.stdout.write('__MARK__\\n'"));
        assert!(source.contains("await solution(input)"));
    }

    #[test]
    fn test_capture_prefixes_source() {
        let program = capture_stdout(&with_global_input("console.log(input.n);", &json!({"n": 2})), "__MARK__");
        assert_eq!(program.sentinel, "__MARK__");
        assert!(program.source.contains("judgeWrite('__MARK__\\n'"));
        assert!(program
            .source
            .ends_with("globalThis.input = {\"n\":2};\nconsole.log(input.n);\n"));
    }
}
