use super::CapturedProgram;

const FUNCTION_PRELUDE: &str = "#include <bits/stdc++.h>
#include <nlohmann/json.hpp>
using namespace std;
using json = nlohmann::json;
";

const FUNCTION_MAIN: &str = r#"
int main() {
    std::string judge_raw((std::istreambuf_iterator<char>(std::cin)), std::istreambuf_iterator<char>());
    json judge_input = json::parse(judge_raw);
    json judge_result = __CALL__(judge_input);
    std::cout << "__SENTINEL__" << '\n' << judge_result.dump() << std::endl;
    return 0;
}
"#;

// Declared before the user code so it is constructed before, and destroyed
// after, any of the user's static objects.
const CAPTURE_PRELUDE: &str = r#"#include <cstdio>
#include <iostream>
#include <unistd.h>

namespace judge_capture {
struct StdoutCapture {
    int saved_fd = -1;
    std::FILE* sink = nullptr;

    StdoutCapture() {
        std::fflush(stdout);
        sink = std::tmpfile();
        if (sink == nullptr) return;
        saved_fd = dup(STDOUT_FILENO);
        if (saved_fd >= 0) dup2(fileno(sink), STDOUT_FILENO);
    }

    ~StdoutCapture() {
        std::cout.flush();
        std::fflush(stdout);
        if (sink == nullptr || saved_fd < 0) return;
        dup2(saved_fd, STDOUT_FILENO);
        close(saved_fd);
        std::fputs("__SENTINEL__\n", stdout);
        std::rewind(sink);
        char buffer[8192];
        std::size_t n;
        while ((n = std::fread(buffer, 1, sizeof(buffer), sink)) > 0) {
            std::fwrite(buffer, 1, n, stdout);
        }
        std::fflush(stdout);
        std::fclose(sink);
    }
};

static StdoutCapture instance;
}

"#;

/// Function mode: include the user code and call `solve(json)` (or
/// `Solution().solve(json)`) with the input parsed from stdin.
pub fn wrap_function(code: &str, sentinel: &str) -> String {
    let call = if declares_solution(code) {
        "Solution().solve"
    } else {
        "solve"
    };
    let main = FUNCTION_MAIN
        .replace("__CALL__", call)
        .replace("__SENTINEL__", sentinel);
    format!("{}\n{}\n{}", FUNCTION_PRELUDE, code, main)
}

/// Redirect fd 1 into an anonymous temp file for the lifetime of the program
/// and replay it after the sentinel at static destruction.
pub fn capture_stdout(source: &str, sentinel: &str) -> CapturedProgram {
    CapturedProgram {
        source: format!(
            "{}{}\n",
            CAPTURE_PRELUDE.replace("__SENTINEL__", sentinel),
            source
        ),
        sentinel: sentinel.to_string(),
    }
}

fn declares_solution(code: &str) -> bool {
    ["class Solution", "struct Solution"].iter().any(|decl| {
        code.match_indices(decl).any(|(start, _)| {
            code[start + decl.len()..]
                .chars()
                .next()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
        })
    })
}
