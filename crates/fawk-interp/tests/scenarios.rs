//! Whole-program scenarios: the kinds of AWK one-liners and small
//! programs the engine exists to run, executed end-to-end through the
//! library API with captured streams.

use fawk_interp::{Interpreter, SharedBuf};
use fawk_util::Handler;

/// Runs `source` over `input` (stdin) and returns stdout, asserting a
/// clean exit.
fn awk(source: &str, input: &str) -> String {
    awk_with(source, input, &[], &[])
}

/// Full-control harness: `-v`-style assigns and file operands.
fn awk_with(source: &str, input: &str, assigns: &[(&str, &str)], files: &[String]) -> String {
    let handler = Handler::new();
    let program = fawk_par::parse_program(source, None, &handler);
    assert!(!handler.has_errors(), "parse errors: {:?}", handler.take());

    let out = SharedBuf::new();
    let err = SharedBuf::new();
    let mut interp = Interpreter::new(program);
    interp.set_stdout(Box::new(out.clone()));
    interp.set_stderr(Box::new(err.clone()));
    interp.set_stdin(Box::new(std::io::Cursor::new(input.as_bytes().to_vec())));
    for (name, value) in assigns {
        interp.assign_var(name, value);
    }
    let status = interp.run(files);
    assert_eq!(status, 0, "stderr: {}", err.contents());
    out.contents()
}

#[test]
fn scenario_reverse_lines() {
    let source = "{ lines[NR] = $0 } END { for (i = NR; i >= 1; i--) print lines[i] }";
    assert_eq!(awk(source, "a\nb\nc\n"), "c\nb\na\n");
}

#[test]
fn scenario_uniq_consecutive() {
    let source = "$0 != prev { print } { prev = $0 }";
    assert_eq!(awk(source, "a\na\nb\nb\na\n"), "a\nb\na\n");
}

#[test]
fn scenario_wc() {
    let source = "{ lines++; words += NF; chars += length($0) + 1 }\n\
                  END { print lines, words, chars }";
    assert_eq!(awk(source, "ab c\nd\n"), "2 3 7\n");
}

#[test]
fn scenario_min_max_avg() {
    let source = "{ s += $1
                    if (NR == 1 || $1 < min) min = $1
                    if (NR == 1 || $1 > max) max = $1 }
                  END { printf \"%d %d %.1f\\n\", min, max, s / NR }";
    assert_eq!(awk(source, "3\n1\n4\n1\n5\n"), "1 5 2.8\n");
}

#[test]
fn scenario_csv_column() {
    let source = "{ print $2 }";
    assert_eq!(
        awk_with(source, "x,1\ny,2\n", &[("FS", ",")], &[]),
        "1\n2\n"
    );
}

#[test]
fn scenario_field_swap() {
    let source = "{ tmp = $1; $1 = $2; $2 = tmp; print }";
    assert_eq!(awk(source, "a b c\n"), "b a c\n");
}

#[test]
fn scenario_number_table() {
    let source = "BEGIN { for (i = 1; i <= 3; i++) \
                  printf \"%-5s|%5.2f|%3d%%\\n\", \"row\" i, i / 3, i * 10 }";
    assert_eq!(
        awk(source, ""),
        "row1 | 0.33| 10%\nrow2 | 0.67| 20%\nrow3 | 1.00| 30%\n"
    );
}

#[test]
fn scenario_marker_extraction() {
    let source = "/^begin$/,/^end$/ { if (!/^begin$/ && !/^end$/) print }";
    assert_eq!(awk(source, "x\nbegin\na\nb\nend\ny\n"), "a\nb\n");
}

#[test]
fn scenario_strip_numbers() {
    let source = "{ gsub(/[0-9]+/, \"#\"); print }";
    assert_eq!(awk(source, "a1b22c333\n"), "a#b#c#\n");
}

#[test]
fn scenario_memoized_fibonacci() {
    let source = "function fib(n) {\n\
                      if (n < 2) return n\n\
                      if (n in memo) return memo[n]\n\
                      return memo[n] = fib(n - 1) + fib(n - 2)\n\
                  }\n\
                  BEGIN { print fib(20) }";
    assert_eq!(awk(source, ""), "6765\n");
}

#[test]
fn scenario_multidim_grid() {
    let source = "BEGIN { for (i = 1; i <= 2; i++) for (j = 1; j <= 2; j++) g[i, j] = i * 10 + j
                  print g[1, 1], g[2, 2], ((1, 2) in g) }";
    assert_eq!(awk(source, ""), "11 22 1\n");
}

#[test]
fn scenario_subsep_is_visible() {
    let source = "BEGIN { SUBSEP = \"-\"; a[1, 2] = \"x\"; for (k in a) print k }";
    assert_eq!(awk(source, ""), "1-2\n");
}

#[test]
fn scenario_word_frequency_sorted() {
    let source = "{ for (i = 1; i <= NF; i++) count[$i]++ }
                  END { n = asorti(count, keys)
                        for (i = 1; i <= n; i++) print keys[i], count[keys[i]] }";
    assert_eq!(awk(source, "b a b\na c\n"), "a 2\nb 2\nc 1\n");
}

#[test]
fn scenario_getline_loop_in_begin() {
    let source = "BEGIN { while ((getline line) > 0) n++; print \"lines:\", n }";
    assert_eq!(awk(source, "x\ny\nz\n"), "lines: 3\n");
}

#[test]
fn scenario_lookup_join() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = dir.path().join("names.txt");
    std::fs::write(&lookup, "1 one\n2 two\n").unwrap();

    let source = "BEGIN { while ((getline line < lookup) > 0) { split(line, kv, \" \"); names[kv[1]] = kv[2] }
                          close(lookup) }
                  { print $1, names[$1] }";
    let out = awk_with(
        source,
        "2\n1\n",
        &[("lookup", &lookup.to_string_lossy())],
        &[],
    );
    assert_eq!(out, "2 two\n1 one\n");
}

#[test]
fn scenario_two_input_files_with_fnr() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.txt");
    let second = dir.path().join("second.txt");
    std::fs::write(&first, "a\nb\n").unwrap();
    std::fs::write(&second, "c\n").unwrap();

    // The classic two-file idiom: FNR == NR only while reading the
    // first file.
    let source = "FNR == NR { firsts[FNR] = $0; next } { print firsts[FNR], $0 }";
    let out = awk_with(
        source,
        "",
        &[],
        &[
            first.to_string_lossy().to_string(),
            second.to_string_lossy().to_string(),
        ],
    );
    assert_eq!(out, "a c\n");
}

#[test]
fn scenario_paragraph_records() {
    let source = "BEGIN { RS = \"\"; FS = \"\\n\" } { print NR \": \" $1 }";
    assert_eq!(
        awk(source, "alpha\ndetail\n\nbeta\nmore\n"),
        "1: alpha\n2: beta\n"
    );
}

#[test]
fn scenario_char_record_separator() {
    let source = "BEGIN { RS = \";\" } { print NR, $0 }";
    assert_eq!(awk(source, "a;b;c"), "1 a\n2 b\n3 c\n");
}

#[test]
fn scenario_regex_record_separator_rt() {
    let source = "BEGIN { RS = \"[0-9]+\" } { print $0, \"[\" RT \"]\" }";
    assert_eq!(awk(source, "a12b3c"), "a [12]\nb [3]\nc []\n");
}

#[test]
fn scenario_accumulate_report() {
    let source = r#"
        $2 == "in"  { total[$1] += $3 }
        $2 == "out" { total[$1] -= $3 }
        END {
            n = asorti(total, who)
            for (i = 1; i <= n; i++)
                printf "%s=%d\n", who[i], total[who[i]]
        }
    "#;
    let input = "amy in 5\nbob in 3\namy out 2\nbob in 1\n";
    assert_eq!(awk(source, input), "amy=3\nbob=4\n");
}

#[test]
fn scenario_ofmt_controls_print() {
    let source = "BEGIN { OFMT = \"%.2f\"; print 3.14159, 2 }";
    assert_eq!(awk(source, ""), "3.14 2\n");
}

#[test]
fn scenario_string_number_coercions() {
    let source = "BEGIN { print \"3\" + \"4\", \"3x\" + 1, \"x\" + 1, 10 \"\" 20 }";
    assert_eq!(awk(source, ""), "7 4 1 1020\n");
}

#[test]
fn scenario_nested_function_array_passing() {
    let source = "function outer(a) { inner(a); return a[\"set\"] }
                  function inner(b) { b[\"set\"] = 99 }
                  BEGIN { print outer(fresh), fresh[\"set\"] }";
    assert_eq!(awk(source, ""), "99 99\n");
}
