use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use voxpipe::pipeline::Segmenter;

/// One paragraph exercising every boundary kind: sentence punctuation,
/// a colon list, a blank-line gap, and an embedded directive.
const PASSAGE: &str = "This is a spoken answer. It has several short sentences, \
each one cut as soon as it completes. Some lines introduce a list:\n\
- The first item here.\n\
- The second item, slightly longer than the first.\n\
\n\
A new paragraph starts after the gap. \
[SYSTEM] [MIDI] [note=C4] [/SYSTEM] And a closing line wraps the answer up.\n";

/// Split a passage into delta-sized chunks on char boundaries.
fn chunked(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars)
        .map(|c| c.iter().collect())
        .collect()
}

/// Feed the whole passage at once, as a `say` invocation would.
fn bench_feed_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmenter_full");

    for repeats in [1usize, 8, 32] {
        let text = PASSAGE.repeat(repeats);
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &text, |b, text| {
            b.iter(|| {
                let mut segmenter = Segmenter::new();
                let mut segments = segmenter.feed(black_box(text));
                segments.extend(segmenter.finalize());
                segments
            });
        });
    }

    group.finish();
}

/// Feed the passage in small deltas, the way a token stream arrives.
/// This is the worst case for the boundary scanner, which re-examines
/// the buffered tail on every delta.
fn bench_feed_streamed(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmenter_streamed");

    for chunk_chars in [4usize, 24, 120] {
        let deltas = chunked(&PASSAGE.repeat(8), chunk_chars);
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_chars),
            &deltas,
            |b, deltas| {
                b.iter(|| {
                    let mut segmenter = Segmenter::new();
                    let mut segments = Vec::new();
                    for delta in deltas {
                        segments.extend(segmenter.feed(black_box(delta)));
                    }
                    segments.extend(segmenter.finalize());
                    segments
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_feed_full, bench_feed_streamed);
criterion_main!(benches);
