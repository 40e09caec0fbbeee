//! Benchmarks for pattern insertion and event matching

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quamina_automaton::{
    ArrayPos, CoreMatcher, EventField, MatchBuffers, PatternField, ThreadSafeCoreMatcher,
    ValueShape,
};

fn lit(path: &str, value: &str) -> PatternField {
    PatternField::new(path, vec![ValueShape::literal(value)])
}

fn bench_exact_match(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    m.add_pattern("p1", &[lit("status", "active")]).unwrap();

    let event = [EventField::new("id", "123"), EventField::new("status", "active")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("exact_match", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_multiple_patterns(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    for i in 0..100 {
        m.add_pattern(format!("p{i}"), &[lit("status", &format!("status_{i}"))])
            .unwrap();
    }

    let hit = [EventField::new("status", "status_50")];
    let miss = [EventField::new("status", "status_500")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("100_patterns", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&hit), &mut bufs))
    });
    c.bench_function("100_patterns_no_match", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&miss), &mut bufs))
    });
}

/// Mirrors the 26-glob shellstyle stress case
fn bench_shellstyle_alphabet(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    for letter in 'A'..='Z' {
        let glob = format!("{letter}*");
        m.add_pattern(
            letter,
            &[PatternField::new("name", vec![ValueShape::Shellstyle(glob.into_bytes())])],
        )
        .unwrap();
    }

    let event = [EventField::new("name", "BELVEDERE"), EventField::new("other", "data")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("shellstyle_26_patterns", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_infix_globs(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    for (i, word) in ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"].iter().enumerate() {
        let glob = format!("*{word}*");
        m.add_pattern(
            i,
            &[PatternField::new("text", vec![ValueShape::Shellstyle(glob.into_bytes())])],
        )
        .unwrap();
    }

    let value = "xx charlie yy ".repeat(20);
    let event = [EventField::new("text", &value)];
    let mut bufs = MatchBuffers::new();

    c.bench_function("infix_globs_long_value", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_prefix_patterns(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    for i in 0..100 {
        m.add_pattern(
            format!("p{i}"),
            &[PatternField::new(
                "path",
                vec![ValueShape::Prefix(format!("/api/v{i}/users").into_bytes())],
            )],
        )
        .unwrap();
    }

    let event = [EventField::new("path", "/api/v50/users/123")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("100_prefix_patterns", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_anything_but(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    m.add_pattern(
        "not_error",
        &[PatternField::new(
            "status",
            vec![ValueShape::AnythingBut(vec![
                b"error".to_vec(),
                b"failed".to_vec(),
                b"timeout".to_vec(),
            ])],
        )],
    )
    .unwrap();

    let event = [EventField::new("code", "200"), EventField::new("status", "success")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("anything_but_match", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_regexp(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    m.add_pattern(
        "email",
        &[PatternField::new(
            "from",
            vec![ValueShape::Regexp("[a-z0-9.]+@[a-z]+~.(com|org)".into())],
        )],
    )
    .unwrap();

    let event = [EventField::new("from", "someone.else@example.org")];
    let mut bufs = MatchBuffers::new();

    c.bench_function("regexp_match", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_multi_field_and(c: &mut Criterion) {
    let mut m = CoreMatcher::new();
    m.add_pattern(
        "p",
        &[
            lit("members.given", "Wata"),
            lit("members.role", "guitar"),
            PatternField::new("deleted", vec![ValueShape::Exists(false)]),
        ],
    )
    .unwrap();

    let pos = |p| vec![ArrayPos::new(1, p)];
    let event = [
        EventField::new("members.given", "Ringo").with_trail(pos(0)),
        EventField::new("members.given", "Wata").with_trail(pos(1)),
        EventField::new("members.role", "drums").with_trail(pos(0)),
        EventField::new("members.role", "guitar").with_trail(pos(1)),
        EventField::new("title", "Abbey Road"),
    ];
    let mut bufs = MatchBuffers::new();

    c.bench_function("multi_field_and_array_trail", |b| {
        b.iter(|| m.matches_for_fields_with(black_box(&event), &mut bufs))
    });
}

fn bench_add_patterns(c: &mut Criterion) {
    c.bench_function("add_200_mixed_patterns", |b| {
        b.iter_batched(
            ThreadSafeCoreMatcher::new,
            |m| {
                for i in 0..200u32 {
                    let shape = match i % 4 {
                        0 => ValueShape::literal(format!("v{i}")),
                        1 => ValueShape::Prefix(format!("p{i}").into_bytes()),
                        2 => ValueShape::Shellstyle(format!("*s{i}*").into_bytes()),
                        _ => ValueShape::EqualsIgnoreCase(format!("Ci{i}")),
                    };
                    m.add_pattern(i, &[PatternField::new("f", vec![shape])]).unwrap();
                }
                m
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_exact_match,
    bench_multiple_patterns,
    // Value shape benchmarks
    bench_shellstyle_alphabet,
    bench_infix_globs,
    bench_prefix_patterns,
    bench_anything_but,
    bench_regexp,
    bench_multi_field_and,
    // Insertion
    bench_add_patterns,
);
criterion_main!(benches);
