use raspe_browser::actions::BrowserActions;
use raspe_browser::BrowserEngine;
use raspe_core::BrowserConfig;
use std::time::Duration;

const LISTING: &str = "data:text/html,<html><body>\
<input id='busca' name='txt_texto[]'>\
<div class='ato'><a href='/ato/1'><strong>Portaria 1</strong></a></div>\
<select id='pagina'><option>1</option><option>2</option></select>\
<div class='pagination'><a onclick='irParaPagina(2)'>2</a></div>\
</body></html>";

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::launch(&BrowserConfig::default()).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
    engine.unwrap().close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_page_actions() {
    let engine = BrowserEngine::launch(&BrowserConfig::default()).await.unwrap();
    let page = engine.new_page().await.unwrap();

    page.navigate(LISTING).await.unwrap();
    page.wait_for_selector("div.ato", Duration::from_secs(5))
        .await
        .unwrap();

    page.fill_field("input[name=\"txt_texto[]\"]", "vacina")
        .await
        .unwrap();
    let value = page
        .evaluate("document.querySelector('#busca').value")
        .await
        .unwrap();
    assert_eq!(value, "vacina");

    assert_eq!(page.extract_text("div.ato strong").await.unwrap(), "Portaria 1");
    assert!(!page.exists("div.missing").await.unwrap());
    page.select_option_index("#pagina", 1).await.unwrap();
    assert!(page.select_option_index("#pagina", 5).await.is_err());

    page.close().await.unwrap();
    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_wait_for_missing_selector_times_out() {
    let engine = BrowserEngine::launch(&BrowserConfig::default()).await.unwrap();
    let page = engine.new_page().await.unwrap();
    page.navigate(LISTING).await.unwrap();

    let err = page
        .wait_for_selector("div.never", Duration::from_secs(2))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    engine.close().await.unwrap();
}
