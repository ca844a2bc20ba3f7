use serde_json::Value;

use super::{string_literal, CapturedProgram, MISSING_ENTRY_POINT};

/// Function mode: `input` is decoded from an embedded JSON literal before the
/// user code runs; afterwards `output` (or `solution(input)`) is dumped.
pub fn wrap_function(code: &str, input: &Value, sentinel: &str) -> String {
    format!(
        r#"import json as _judge_json
import sys as _judge_sys

input = _judge_json.loads({input})

{code}


def _judge_main():
    namespace = globals()
    if "output" in namespace:
        result = namespace["output"]
    elif callable(namespace.get("solution")):
        result = namespace["solution"](input)
    else:
        _judge_sys.stderr.write({missing} + "\n")
        _judge_sys.exit(1)
    _judge_sys.stdout.write("{sentinel}\n" + _judge_json.dumps(result) + "\n")


_judge_main()
"#,
        input = string_literal(&input.to_string()),
        code = code,
        missing = string_literal(MISSING_ENTRY_POINT),
        sentinel = sentinel,
    )
}

/// Swap `sys.stdout` for an in-memory buffer and flush it after the sentinel
/// from an `atexit` hook, which also runs on uncaught exceptions.
pub fn capture_stdout(source: &str, sentinel: &str) -> CapturedProgram {
    let wrapped = format!(
        r#"import atexit as _judge_atexit
import io as _judge_io
import sys as _judge_sys

_judge_stdout = _judge_sys.stdout
_judge_buffer = _judge_io.StringIO()
_judge_sys.stdout = _judge_buffer


def _judge_flush():
    _judge_stdout.write("{sentinel}\n")
    _judge_stdout.write(_judge_buffer.getvalue())
    _judge_stdout.flush()


_judge_atexit.register(_judge_flush)

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
