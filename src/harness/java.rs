//! Java harness
//!
//! Everything lands in one `.java` file named after a generated public
//! launcher class. User types are demoted to package-private so the file has
//! exactly one public top-level class, and user imports are hoisted above
//! both. The launcher never imports anything itself; all JDK names are fully
//! qualified so they cannot clash with user imports.

use super::CapturedProgram;

const PUBLIC_TYPE_PREFIXES: [&str; 6] = [
    "public class ",
    "public final class ",
    "public abstract class ",
    "public interface ",
    "public enum ",
    "public record ",
];

const FUNCTION_LAUNCHER: &str = r##"
public class __LAUNCHER__ {
    public static void main(String[] args) throws Throwable {
        String raw = new String(System.in.readAllBytes(), java.nio.charset.StandardCharsets.UTF_8);
        Object input = new Json(raw).parse();
        java.lang.reflect.Method target = null;
        for (java.lang.reflect.Method m : Solution.class.getDeclaredMethods()) {
            if (m.getName().equals("solve")) {
                target = m;
                break;
            }
        }
        if (target == null) {
            System.err.println("Solution.solve method not found");
            System.exit(1);
            return;
        }
        target.setAccessible(true);
        Object[] callArgs = arguments(target, input);
        Object receiver = null;
        if (!java.lang.reflect.Modifier.isStatic(target.getModifiers())) {
            java.lang.reflect.Constructor<?> ctor = Solution.class.getDeclaredConstructor();
            ctor.setAccessible(true);
            receiver = ctor.newInstance();
        }
        Object result;
        try {
            result = target.invoke(receiver, callArgs);
        } catch (java.lang.reflect.InvocationTargetException e) {
            throw e.getCause();
        }
        StringBuilder out = new StringBuilder();
        write(out, result);
        System.out.println("__SENTINEL__");
        System.out.println(out);
        System.out.flush();
    }

    static Object[] arguments(java.lang.reflect.Method m, Object input) {
        Class<?>[] types = m.getParameterTypes();
        java.lang.reflect.Type[] generics = m.getGenericParameterTypes();
        if (types.length == 0) {
            return new Object[0];
        }
        if (types.length == 1) {
            Object value = input;
            if (input instanceof java.util.Map && ((java.util.Map<?, ?>) input).size() == 1
                    && !java.util.Map.class.isAssignableFrom(types[0]) && types[0] != Object.class) {
                value = ((java.util.Map<?, ?>) input).values().iterator().next();
            }
            return new Object[] { convert(value, types[0], generics[0]) };
        }
        java.util.List<Object> values = new java.util.ArrayList<>();
        if (input instanceof java.util.Map) {
            values.addAll(((java.util.Map<?, ?>) input).values());
        } else if (input instanceof java.util.List) {
            values.addAll((java.util.List<?>) input);
        } else {
            values.add(input);
        }
        if (values.size() != types.length) {
            throw new IllegalArgumentException("solve expects " + types.length
                    + " arguments but the input provides " + values.size());
        }
        Object[] out = new Object[types.length];
        for (int i = 0; i < types.length; i++) {
            out[i] = convert(values.get(i), types[i], generics[i]);
        }
        return out;
    }

    static Object convert(Object value, Class<?> type, java.lang.reflect.Type generic) {
        if (value == null) {
            if (type.isPrimitive()) {
                throw new IllegalArgumentException("null given for " + type.getName());
            }
            return null;
        }
        if (type == int.class || type == Integer.class) return ((Number) value).intValue();
        if (type == long.class || type == Long.class) return ((Number) value).longValue();
        if (type == double.class || type == Double.class) return ((Number) value).doubleValue();
        if (type == float.class || type == Float.class) return ((Number) value).floatValue();
        if (type == short.class || type == Short.class) return ((Number) value).shortValue();
        if (type == byte.class || type == Byte.class) return ((Number) value).byteValue();
        if (type == boolean.class || type == Boolean.class) return (Boolean) value;
        if (type == char.class || type == Character.class) return value.toString().charAt(0);
        if (type == String.class) {
            if (value instanceof String) return value;
            StringBuilder text = new StringBuilder();
            write(text, value);
            return text.toString();
        }
        if (type.isArray()) {
            Class<?> component = type.getComponentType();
            if (value instanceof String && component == char.class) {
                return ((String) value).toCharArray();
            }
            java.util.List<?> items = (java.util.List<?>) value;
            Object array = java.lang.reflect.Array.newInstance(component, items.size());
            for (int i = 0; i < items.size(); i++) {
                java.lang.reflect.Array.set(array, i, convert(items.get(i), component, component));
            }
            return array;
        }
        if (java.util.Collection.class.isAssignableFrom(type) && value instanceof java.util.List) {
            java.lang.reflect.Type element = typeArgument(generic, 0);
            java.util.Collection<Object> out;
            if (java.util.Set.class.isAssignableFrom(type)) {
                out = new java.util.LinkedHashSet<Object>();
            } else {
                out = new java.util.ArrayList<Object>();
            }
            for (Object item : (java.util.List<?>) value) {
                out.add(convert(item, rawClass(element), element));
            }
            return out;
        }
        if (java.util.Map.class.isAssignableFrom(type) && value instanceof java.util.Map) {
            java.lang.reflect.Type valueType = typeArgument(generic, 1);
            java.util.Map<String, Object> out = new java.util.LinkedHashMap<String, Object>();
            for (java.util.Map.Entry<?, ?> e : ((java.util.Map<?, ?>) value).entrySet()) {
                out.put(String.valueOf(e.getKey()), convert(e.getValue(), rawClass(valueType), valueType));
            }
            return out;
        }
        return value;
    }

    static java.lang.reflect.Type typeArgument(java.lang.reflect.Type generic, int index) {
        if (generic instanceof java.lang.reflect.ParameterizedType) {
            java.lang.reflect.Type[] params = ((java.lang.reflect.ParameterizedType) generic).getActualTypeArguments();
            if (index < params.length) {
                return params[index];
            }
        }
        return Object.class;
    }

    static Class<?> rawClass(java.lang.reflect.Type type) {
        if (type instanceof Class) {
            return (Class<?>) type;
        }
        if (type instanceof java.lang.reflect.ParameterizedType) {
            return rawClass(((java.lang.reflect.ParameterizedType) type).getRawType());
        }
        return Object.class;
    }

    static void write(StringBuilder out, Object value) {
        if (value == null) {
            out.append("null");
        } else if (value instanceof String || value instanceof Character) {
            quote(out, value.toString());
        } else if (value instanceof Double || value instanceof Float) {
            double d = ((Number) value).doubleValue();
            out.append(Double.isNaN(d) || Double.isInfinite(d) ? "null" : value.toString());
        } else if (value instanceof Number || value instanceof Boolean) {
            out.append(value.toString());
        } else if (value instanceof java.util.Map) {
            out.append('{');
            boolean first = true;
            for (java.util.Map.Entry<?, ?> e : ((java.util.Map<?, ?>) value).entrySet()) {
                if (!first) out.append(',');
                first = false;
                quote(out, String.valueOf(e.getKey()));
                out.append(':');
                write(out, e.getValue());
            }
            out.append('}');
        } else if (value instanceof Iterable) {
            out.append('[');
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) out.append(',');
                first = false;
                write(out, item);
            }
            out.append(']');
        } else if (value.getClass().isArray()) {
            out.append('[');
            int length = java.lang.reflect.Array.getLength(value);
            for (int i = 0; i < length; i++) {
                if (i > 0) out.append(',');
                write(out, java.lang.reflect.Array.get(value, i));
            }
            out.append(']');
        } else {
            quote(out, value.toString());
        }
    }

    static void quote(StringBuilder out, String s) {
        out.append('"');
        for (int i = 0; i < s.length(); i++) {
            char c = s.charAt(i);
            switch (c) {
                case '"': out.append("\\\""); break;
                case '\\': out.append("\\\\"); break;
                case '\n': out.append("\\n"); break;
                case '\r': out.append("\\r"); break;
                case '\t': out.append("\\t"); break;
                default:
                    if (c < 0x20) {
                        out.append(String.format("\\u%04x", (int) c));
                    } else {
                        out.append(c);
                    }
            }
        }
        out.append('"');
    }

    static final class Json {
        private final String s;
        private int i;

        Json(String s) {
            this.s = s;
        }

        Object parse() {
            Object value = value();
            ws();
            if (i != s.length()) {
                throw error("trailing characters");
            }
            return value;
        }

        private Object value() {
            ws();
            if (i >= s.length()) {
                throw error("unexpected end of input");
            }
            switch (s.charAt(i)) {
                case '{': return object();
                case '[': return array();
                case '"': return string();
                case 't': literal("true"); return Boolean.TRUE;
                case 'f': literal("false"); return Boolean.FALSE;
                case 'n': literal("null"); return null;
                default: return number();
            }
        }

        private java.util.Map<String, Object> object() {
            java.util.Map<String, Object> map = new java.util.LinkedHashMap<String, Object>();
            expect('{');
            ws();
            if (peek() == '}') {
                i++;
                return map;
            }
            while (true) {
                ws();
                String key = string();
                ws();
                expect(':');
                map.put(key, value());
                ws();
                if (peek() == ',') {
                    i++;
                    continue;
                }
                expect('}');
                return map;
            }
        }

        private java.util.List<Object> array() {
            java.util.List<Object> list = new java.util.ArrayList<Object>();
            expect('[');
            ws();
            if (peek() == ']') {
                i++;
                return list;
            }
            while (true) {
                list.add(value());
                ws();
                if (peek() == ',') {
                    i++;
                    continue;
                }
                expect(']');
                return list;
            }
        }

        private String string() {
            expect('"');
            StringBuilder sb = new StringBuilder();
            while (true) {
                if (i >= s.length()) {
                    throw error("unterminated string");
                }
                char c = s.charAt(i++);
                if (c == '"') {
                    return sb.toString();
                }
                if (c != '\\') {
                    sb.append(c);
                    continue;
                }
                char e = s.charAt(i++);
                switch (e) {
                    case 'n': sb.append('\n'); break;
                    case 't': sb.append('\t'); break;
                    case 'r': sb.append('\r'); break;
                    case 'b': sb.append('\b'); break;
                    case 'f': sb.append('\f'); break;
                    case 'u':
                        sb.append((char) Integer.parseInt(s.substring(i, i + 4), 16));
                        i += 4;
                        break;
                    default: sb.append(e);
                }
            }
        }

        private Object number() {
            int start = i;
            while (i < s.length() && "+-0123456789.eE".indexOf(s.charAt(i)) >= 0) {
                i++;
            }
            String text = s.substring(start, i);
            if (text.isEmpty()) {
                throw error("unexpected character");
            }
            if (text.indexOf('.') < 0 && text.indexOf('e') < 0 && text.indexOf('E') < 0) {
                try {
                    return Long.parseLong(text);
                } catch (NumberFormatException ignored) {
                    // falls through to double
                }
            }
            return Double.parseDouble(text);
        }

        private void literal(String word) {
            if (!s.startsWith(word, i)) {
                throw error("invalid literal");
            }
            i += word.length();
        }

        private char peek() {
            return i < s.length() ? s.charAt(i) : '\0';
        }

        private void expect(char c) {
            if (peek() != c) {
                throw error("expected '" + c + "'");
            }
            i++;
        }

        private void ws() {
            while (i < s.length() && Character.isWhitespace(s.charAt(i))) {
                i++;
            }
        }

        private IllegalArgumentException error(String message) {
            return new IllegalArgumentException("invalid JSON input at " + i + ": " + message);
        }
    }
}
"##;

const CAPTURE_LAUNCHER: &str = r##"
public class __LAUNCHER__ {
    public static void main(String[] args) throws Throwable {
        final java.io.PrintStream original = System.out;
        final java.io.ByteArrayOutputStream buffer = new java.io.ByteArrayOutputStream();
        System.setOut(new java.io.PrintStream(buffer, true, "UTF-8"));
        Runtime.getRuntime().addShutdownHook(new Thread(() -> {
            System.out.flush();
            original.println("__SENTINEL__");
            original.print(new String(buffer.toByteArray(), java.nio.charset.StandardCharsets.UTF_8));
            original.flush();
        }));
        __MAIN_CLASS__.main(args);
    }
}
"##;

/// Function mode: keep or synthesize `class Solution` and append a launcher
/// that reads JSON from stdin and calls `Solution.solve` reflectively.
pub fn wrap_function(code: &str, launcher: &str, sentinel: &str) -> String {
    let (imports, body) = lift_imports(code);
    let body = demote_public_types(&body);
    let body = if declares_type(&body, "Solution") {
        body
    } else {
        format!("class Solution {{\n{}\n}}\n", body)
    };

    let launcher_source = FUNCTION_LAUNCHER
        .replace("__LAUNCHER__", launcher)
        .replace("__SENTINEL__", sentinel);
    assemble(&imports, &body, &launcher_source)
}

/// Full-program mode: run the user's `main` behind a launcher that redirects
/// `System.out` into a buffer and emits it from a shutdown hook.
pub fn capture_stdout(code: &str, launcher: &str, sentinel: &str) -> CapturedProgram {
    let (imports, body) = lift_imports(code);
    let body = demote_public_types(&body);
    let (main_class, body) = match find_main_class(&body) {
        Some(name) => (name, body),
        None => (
            "Main".to_string(),
            format!(
                "class Main {{\n    public static void main(String[] args) throws Exception {{\n{}\n    }}\n}}\n",
                body
            ),
        ),
    };

    let launcher_source = CAPTURE_LAUNCHER
        .replace("__LAUNCHER__", launcher)
        .replace("__SENTINEL__", sentinel)
        .replace("__MAIN_CLASS__", &main_class);

    CapturedProgram {
        source: assemble(&imports, &body, &launcher_source),
        sentinel: sentinel.to_string(),
    }
}

fn assemble(imports: &[&str], body: &str, launcher: &str) -> String {
    let mut source = String::new();
    for import in imports {
        source.push_str(import.trim());
        source.push('\n');
    }
    source.push('\n');
    source.push_str(body);
    source.push('\n');
    source.push_str(launcher);
    source
}

/// Split leading `import` lines from the rest; `package` lines are dropped
fn lift_imports(code: &str) -> (Vec<&str>, String) {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("import ") {
            imports.push(line);
        } else if !trimmed.starts_with("package ") {
            body.push(line);
        }
    }
    (imports, body.join("\n"))
}

fn demote_public_types(body: &str) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if PUBLIC_TYPE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
                let indent = &line[..line.len() - trimmed.len()];
                format!("{}{}", indent, &trimmed["public ".len()..])
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True if `class <name>` or similar declares `name` as a whole word
fn declares_type(body: &str, name: &str) -> bool {
    ["class ", "interface ", "record ", "enum "].iter().any(|keyword| {
        body.match_indices(keyword).any(|(start, _)| {
            is_word_start(body, start)
                && identifier_at(&body[start + keyword.len()..]).as_deref() == Some(name)
        })
    })
}

/// Name of the class whose body contains `static void main`
fn find_main_class(body: &str) -> Option<String> {
    let main_at = body.find("static void main")?;
    body[..main_at]
        .match_indices("class ")
        .filter(|(start, _)| is_word_start(body, *start))
        .filter_map(|(start, keyword)| identifier_at(&body[start + keyword.len()..]))
        .last()
}

fn is_word_start(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '$'))
}

fn identifier_at(text: &str) -> Option<String> {
    let name: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_method_is_wrapped_in_solution() {
        let source = wrap_function(
            "import java.util.*;\npublic int[] solve(int[] nums, int target) { return new int[] {0, 1}; }",
            "Judge1234",
            "__MARK__",
        );
        assert!(source.starts_with("import java.util.*;\n"));
        assert!(source.contains("class Solution {\npublic int[] solve("));
        assert!(source.contains("public class Judge1234 {"));
        assert!(source.contains("System.out.println(\"__MARK__\");"));
        assert!(!source.contains("__LAUNCHER__"));
    }

    #[test]
    fn test_public_solution_is_demoted() {
        let source = wrap_function(
            "public class Solution {\n    public static class Node {}\n    static int solve(int n) { return n; }\n}",
            "Judge1",
            "__MARK__",
        );
        assert!(source.contains("\nclass Solution {"));
        assert!(source.contains("    public static class Node {}"));
        assert!(!source.contains("class Solution {\nclass Solution"));
        assert_eq!(source.matches("public class ").count(), 1);
    }

    #[test]
    fn test_capture_finds_main_class() {
        let program = capture_stdout(
            "package app;\nimport java.util.Scanner;\n\nclass Helper {}\npublic class Main {\n    public static void main(String[] args) {\n        System.out.println(1);\n    }\n}",
            "Judge99",
            "__MARK__",
        );
        assert!(!program.source.contains("package app;"));
        assert!(program.source.starts_with("import java.util.Scanner;\n"));
        assert!(program.source.contains("Main.main(args);"));
        assert!(program.source.contains("\nclass Main {"));
        assert!(program.source.contains("original.println(\"__MARK__\");"));
    }

    #[test]
    fn test_capture_synthesizes_main_for_statements() {
        let program = capture_stdout("System.out.println(42);", "Judge7", "__MARK__");
        assert!(program.source.contains("class Main {\n    public static void main"));
        assert!(program.source.contains("Main.main(args);"));
    }

    #[test]
    fn test_declares_type_is_word_aware() {
        assert!(declares_type("final class Solution{}", "Solution"));
        assert!(!declares_type("class SolutionHelper {}", "Solution"));
        assert!(!declares_type("subclass Solution", "Solution"));
    }

    #[test]
    fn test_find_main_class_picks_enclosing_class() {
        let body = "class A {}\nclass B {\n public static void main(String[] a) {}\n}";
        assert_eq!(find_main_class(body).as_deref(), Some("B"));
        assert_eq!(find_main_class("class A {}"), None);
    }
}
