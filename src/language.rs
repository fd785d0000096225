use anyhow::{anyhow, Result};

/// Pattern sets for one supported language.
///
/// Profiles are static data; the classifier compiles them into a lookup table
/// once per session.
#[derive(Debug)]
pub struct LanguageProfile {
    pub id: &'static str,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub boilerplate: &'static [&'static str],
    pub brackets: &'static [char],
    pub punctuation: &'static [char],
    /// Characters after which a human takes a short beat.
    pub statement_terminators: &'static [char],
}

impl LanguageProfile {
    /// Resolve a profile by identifier or alias, ignoring ASCII case.
    pub fn lookup(name: &str) -> Result<&'static LanguageProfile> {
        let name = name.trim();
        BUILTIN_PROFILES
            .iter()
            .find(|p| {
                p.id.eq_ignore_ascii_case(name)
                    || p.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| {
                anyhow!(
                    "unknown language {name:?}; supported: {}",
                    supported_ids().join(", ")
                )
            })
    }

    pub fn is_statement_terminator(&self, c: char) -> bool {
        self.statement_terminators.contains(&c)
    }
}

pub fn builtin_profiles() -> &'static [LanguageProfile] {
    &BUILTIN_PROFILES
}

pub fn supported_ids() -> Vec<&'static str> {
    BUILTIN_PROFILES.iter().map(|p| p.id).collect()
}

const CODE_BRACKETS: &[char] = &['(', ')', '{', '}', '[', ']'];
const CODE_PUNCTUATION: &[char] = &[';', ',', '.', ':'];
const BRACE_TERMINATORS: &[char] = &[';', '{', '}'];

const JS_KEYWORDS: &[&str] = &[
    "function", "const", "let", "var", "return", "if", "else", "for", "while", "do", "switch",
    "case", "break", "continue", "try", "catch", "finally", "throw", "new", "this", "typeof",
    "instanceof", "in", "delete", "void", "true", "false", "null", "undefined", "export",
    "import", "from", "default", "as", "async", "await", "class", "extends",
];

const JS_BOILERPLATE: &[&str] = &[
    "console.log",
    "document.getElementById",
    "addEventListener",
    "querySelector",
    "querySelectorAll",
    "createElement",
    "setAttribute",
    "getAttribute",
    "appendChild",
    "removeChild",
    "JSON.stringify",
    "JSON.parse",
    "Object.keys",
    "Array.from",
    "=>",
    "() =>",
    "async () =>",
    "Promise",
    ".then",
    ".catch",
    ".finally",
];

static BUILTIN_PROFILES: [LanguageProfile; 8] = [
    LanguageProfile {
        id: "Java",
        aliases: &[],
        keywords: &[
            "public", "private", "protected", "static", "final", "void", "int", "String",
            "boolean", "class", "interface", "extends", "implements", "import", "package", "try",
            "catch", "finally", "throw", "throws", "new", "this", "super", "return", "if", "else",
            "while", "for", "do", "switch", "case", "break", "continue",
        ],
        boilerplate: &[
            "System.out.println",
            "String[] args",
            "@Override",
            "@Autowired",
            "@Component",
            "@Service",
            "@Repository",
            "@Entity",
            "@Table",
            "@Column",
            "@Id",
            "@GeneratedValue",
            "@Deprecated",
            "@SuppressWarnings",
            "@Test",
            "ArrayList<>",
            "HashMap<>",
            "List<>",
            "Map<>",
            "Set<>",
        ],
        brackets: &['(', ')', '{', '}', '[', ']', '<', '>'],
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "JavaScript",
        aliases: &["js"],
        keywords: JS_KEYWORDS,
        boilerplate: JS_BOILERPLATE,
        brackets: CODE_BRACKETS,
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "TypeScript",
        aliases: &["ts"],
        keywords: &[
            "function", "const", "let", "var", "return", "if", "else", "for", "while", "do",
            "switch", "case", "break", "continue", "try", "catch", "finally", "throw", "new",
            "this", "typeof", "instanceof", "in", "void", "true", "false", "null", "undefined",
            "export", "import", "from", "default", "as", "async", "await", "class", "extends",
            "implements", "interface", "type", "enum", "readonly", "private", "public",
            "protected", "string", "number", "boolean", "any", "unknown", "never",
        ],
        boilerplate: &[
            "console.log",
            "JSON.stringify",
            "JSON.parse",
            "Object.keys",
            "Array.from",
            "Promise<void>",
            "Record<string, ",
            "=>",
            "() =>",
            "async () =>",
            ".then",
            ".catch",
        ],
        brackets: &['(', ')', '{', '}', '[', ']', '<', '>'],
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "React",
        aliases: &["jsx", "tsx"],
        keywords: &[
            "function", "const", "let", "return", "if", "else", "export", "import", "from",
            "default", "async", "await", "true", "false", "null", "className", "onClick",
            "onChange", "onSubmit", "onFocus", "onBlur", "onMouseEnter", "onMouseLeave",
            "onKeyDown", "onKeyUp", "value", "placeholder", "disabled", "checked", "selected",
            "key", "ref",
        ],
        boilerplate: &[
            "useState",
            "useEffect",
            "useContext",
            "useCallback",
            "useMemo",
            "useRef",
            "useReducer",
            "useImperativeHandle",
            "useLayoutEffect",
            "useDebugValue",
            "useId",
            "useDeferredValue",
            "useTransition",
            "import React",
            "export default",
            "React.Component",
            "React.Fragment",
            "PropTypes",
            "defaultProps",
            "componentDidMount",
            "componentDidUpdate",
            "componentWillUnmount",
            "<div>",
            "<span>",
            "<p>",
            "<h1>",
            "<h2>",
            "<h3>",
            "<button>",
            "<input>",
            "<form>",
            "=>",
            "() =>",
        ],
        brackets: CODE_BRACKETS,
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "CSS",
        aliases: &["scss"],
        keywords: &[
            "flex", "block", "inline", "inline-block", "grid", "none", "auto", "center", "left",
            "right", "absolute", "relative", "fixed", "sticky", "bold", "normal", "italic",
            "underline", "transparent", "inherit",
        ],
        boilerplate: &[
            "display:",
            "position:",
            "top:",
            "right:",
            "bottom:",
            "left:",
            "width:",
            "height:",
            "margin:",
            "padding:",
            "border:",
            "color:",
            "background:",
            "background-color:",
            "font-size:",
            "font-weight:",
            "font-family:",
            "text-align:",
            "text-decoration:",
            "line-height:",
            "z-index:",
            "opacity:",
            "visibility:",
            "overflow:",
            "float:",
            "clear:",
            "cursor:",
            "box-shadow:",
            "border-radius:",
            ":hover",
            ":focus",
            ":active",
            ":first-child",
            ":last-child",
            ":nth-child",
            "::placeholder",
            "@media",
            "@keyframes",
            "@import",
            "@font-face",
        ],
        brackets: &['(', ')', '{', '}', '[', ']'],
        punctuation: &[';', ',', ':'],
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "Python",
        aliases: &["py"],
        keywords: &[
            "def", "class", "return", "if", "elif", "else", "for", "while", "in", "not", "and",
            "or", "is", "import", "from", "as", "try", "except", "finally", "raise", "with",
            "yield", "lambda", "pass", "break", "continue", "None", "True", "False", "self",
            "async", "await", "global", "nonlocal",
        ],
        boilerplate: &[
            "if __name__ == \"__main__\":",
            "def __init__(self",
            "print(",
            "self.",
            "@staticmethod",
            "@classmethod",
            "@property",
            "import os",
            "import sys",
        ],
        brackets: CODE_BRACKETS,
        punctuation: &[':', ',', '.'],
        statement_terminators: &[':'],
    },
    LanguageProfile {
        id: "C++",
        aliases: &["cpp", "cxx"],
        keywords: &[
            "int", "char", "bool", "void", "double", "float", "long", "auto", "const",
            "constexpr", "static", "class", "struct", "public", "private", "protected",
            "virtual", "override", "template", "typename", "namespace", "using", "return", "if",
            "else", "for", "while", "do", "switch", "case", "break", "continue", "new",
            "delete", "this", "nullptr", "true", "false",
        ],
        boilerplate: &[
            "#include",
            "std::cout",
            "std::endl",
            "std::string",
            "std::vector",
            "std::map",
            "std::unique_ptr",
            "std::shared_ptr",
            "using namespace std;",
            "int main(",
        ],
        brackets: &['(', ')', '{', '}', '[', ']', '<', '>'],
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
    LanguageProfile {
        id: "C#",
        aliases: &["csharp", "cs"],
        keywords: &[
            "public", "private", "protected", "internal", "static", "readonly", "void", "int",
            "string", "bool", "var", "class", "interface", "struct", "namespace", "using", "new",
            "this", "base", "return", "if", "else", "for", "foreach", "in", "while", "do",
            "switch", "case", "break", "continue", "try", "catch", "finally", "throw", "async",
            "await", "null", "true", "false",
        ],
        boilerplate: &[
            "Console.WriteLine",
            "string[] args",
            "List<>",
            "Dictionary<>",
            "Task<>",
            "[HttpGet]",
            "[HttpPost]",
            "{ get; set; }",
        ],
        brackets: &['(', ')', '{', '}', '[', ']', '<', '>'],
        punctuation: CODE_PUNCTUATION,
        statement_terminators: BRACE_TERMINATORS,
    },
];
