use biosketch_canvas::{IllustrationPlayer, Outputs};
use biosketch_core::{parse_reply, Catalog, KeywordClassifier, SymptomClassifier, Timeline};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Player whose action labels are stamped with the ms elapsed since creation.
fn timed_player() -> (IllustrationPlayer, JoinHandle<Vec<(String, u64)>>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let start = Instant::now();
    let stamps = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(action) = rx.recv().await {
            seen.push((action, start.elapsed().as_millis() as u64));
        }
        seen
    });
    (IllustrationPlayer::new().with_actions(tx), stamps)
}

fn drawing_times(keys: &[String], step_ms: u64) -> Vec<(String, u64)> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| (format!("Dibujando: {}", key), i as u64 * step_ms))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn gases_symptom_plays_its_whole_sequence() {
    let catalog = Catalog::builtin();
    let entry = SymptomClassifier::new(&catalog).classify("tengo muchos gases e hinchazón");
    assert_eq!(entry.category, "gases");

    let player = IllustrationPlayer::new();
    let start = Instant::now();
    let drawn = player.play_sequence(&entry.drawings, Duration::from_millis(2000)).await;

    assert_eq!(drawn, entry.drawings.len());
    assert_eq!(player.drawing_count().await, entry.drawings.len());
    assert_eq!(
        start.elapsed(),
        Duration::from_millis(2000 * (entry.drawings.len() as u64 - 1))
    );
    let last = entry.drawings.last().unwrap();
    assert_eq!(player.last_action().await, format!("Dibujando: {}", last));
}

#[tokio::test(start_paused = true)]
async fn timeline_suffix_drives_the_canvas() {
    let reply = parse_reply("Hola. TIMELINE: 0:probiotico, 2:intestino");
    let timeline = Timeline::for_text(reply.events.clone(), &reply.text);
    let player = IllustrationPlayer::new();

    assert_eq!(player.play_timeline(&timeline).await, 2);
    let svg = player.svg().await;
    assert!(svg.contains("ProBio+"));
    assert!(svg.contains("Intestino Delgado"));
}

#[tokio::test]
async fn concurrent_sequences_share_one_canvas() {
    let player = IllustrationPlayer::new();
    let a = player.clone();
    let b = player.clone();
    let (x, y) = tokio::join!(
        async move { a.play_sequence(&["lactobacilo"], Duration::ZERO).await },
        async move { b.play_sequence(&["bifidobacteria"], Duration::ZERO).await },
    );
    assert_eq!(x + y, 2);
    assert_eq!(player.drawing_count().await, 2);
    let svg = player.svg().await;
    assert!(svg.contains("lactobacillus"));
    assert!(svg.contains("bifidobacterium"));
}

#[tokio::test]
async fn outputs_land_in_the_requested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let player = IllustrationPlayer::new();
    player.draw("defensas").await;

    let svg_only = player
        .save(dir.path(), "svg-only", Outputs { svg: true, scene: false }, 1.0)
        .await
        .unwrap();
    assert_eq!(svg_only.len(), 1);

    let scene_only = player
        .save(dir.path(), "scene-only", Outputs { svg: false, scene: true }, 1.0)
        .await
        .unwrap();
    let json = std::fs::read_to_string(&scene_only[0]).unwrap();
    assert!(json.contains("\"key\": \"defensas\""));
}

#[tokio::test(start_paused = true)]
async fn keyword_stagger_holds_after_a_composite() {
    let catalog = Catalog::builtin();
    let matched = KeywordClassifier::new(&catalog).detect("la digestión y la microbiota");
    assert_eq!(matched.len(), 2);
    assert!(matched.iter().any(|k| k == "digestion"));

    let (player, stamps) = timed_player();
    let timeline = Timeline::stepped(matched.iter().cloned(), 1.0);
    assert_eq!(player.play_timeline(&timeline).await, 2);
    drop(player);

    assert_eq!(stamps.await.unwrap(), drawing_times(&matched, 1000));
}

#[tokio::test(start_paused = true)]
async fn acidez_sequence_keeps_its_two_second_rhythm() {
    let catalog = Catalog::builtin();
    let entry = SymptomClassifier::new(&catalog).classify("tengo acidez y reflujo");
    assert_eq!(entry.category, "acidez");
    assert!(entry.drawings.iter().any(|k| k == "digestion"));

    let (player, stamps) = timed_player();
    let drawn = player.play_sequence(&entry.drawings, Duration::from_millis(2000)).await;
    assert_eq!(drawn, entry.drawings.len());
    drop(player);

    assert_eq!(stamps.await.unwrap(), drawing_times(&entry.drawings, 2000));
}
