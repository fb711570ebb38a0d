use std::future::Future;

use reqwest::{Client, Response};

use crate::config::Config;
use crate::model::{AudioAsset, Language, Level};
use crate::{info_time, Error, Result, USER_AGENT};

const TOPICS: &str = "1,2,3,4,5,6,7,8,9";
const LESSONS: &str = "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18";
const TEXTS: &str = "act,comp,vocab";

/// Where the pipeline gets its pages and audio from.
/// `HttpSource` talks to the site, tests plug in fixtures.
pub trait Source {
    /// Returns the raw words page (JSON) for one language/level pair.
    fn fetch_words(
        &self,
        language: Language,
        level: Level,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Returns the bytes of one audio clip.
    fn fetch_audio(&self, asset: &AudioAsset) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// `https://words.marugotoweb.jp/SearchCategoryAPI?lv=A1&tp=...&ls=...&tx=...&ut=en`
pub fn words_url(base_url: &str, language: Language, level: Level) -> String {
    format!(
        "{base_url}/SearchCategoryAPI?lv={level}&tp={TOPICS}&ls={LESSONS}&tx={TEXTS}&ut={language}"
    )
}

pub fn audio_url(base_url: &str, asset: &AudioAsset) -> String {
    format!("{base_url}{}", asset.remote_path())
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// One GET, no retries. Non-2xx statuses and timeouts come back as typed errors.
    async fn get(&self, url: &str) -> Result<Response> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_transport(url, e))?;
        res.error_for_status()
            .map_err(|e| Error::from_transport(url, e))
    }
}

impl Source for HttpSource {
    async fn fetch_words(&self, language: Language, level: Level) -> Result<String> {
        let url = words_url(&self.base_url, language, level);
        info_time!("Requesting words: {language}-{level}");
        let res = self.get(&url).await?;
        let json = res.text().await.map_err(|e| Error::from_transport(&url, e))?;
        Ok(json)
    }

    async fn fetch_audio(&self, asset: &AudioAsset) -> Result<Vec<u8>> {
        let url = audio_url(&self.base_url, asset);
        let res = self.get(&url).await?;
        let bytes = res.bytes().await.map_err(|e| Error::from_transport(&url, e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::BASE_URL;

    /// Local server that answers every connection with `reply`, or never answers when `None`.
    async fn serve(reply: Option<&'static str>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    match reply {
                        Some(reply) => {
                            let _ = socket.write_all(reply.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        None => tokio::time::sleep(Duration::from_secs(30)).await,
                    }
                });
            }
        });
        addr
    }

    fn source_for(addr: SocketAddr, timeout: Duration) -> HttpSource {
        let config = Config {
            base_url: format!("http://{addr}"),
            timeout,
            ..Config::default()
        };
        HttpSource::new(&config).unwrap()
    }

    #[test]
    fn words_url_carries_every_query_part() {
        let url = words_url(BASE_URL, Language::En, Level::A2_1);
        assert_eq!(
            url,
            "https://words.marugotoweb.jp/SearchCategoryAPI?lv=A2-1&tp=1,2,3,4,5,6,7,8,9\
             &ls=1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18&tx=act,comp,vocab&ut=en"
        );
    }

    #[test]
    fn audio_url_points_into_the_level_folder() {
        let asset = AudioAsset::from_raw_id(Level::A1, "A1-0012").unwrap();
        assert_eq!(
            audio_url(BASE_URL, &asset),
            "https://words.marugotoweb.jp/res/keyword/audio/A1W/A1W_0012.mp3"
        );
    }

    #[test]
    fn http_source_builds_from_config() {
        let config = Config::default();
        let source = HttpSource::new(&config).unwrap();
        assert_eq!(source.base_url, BASE_URL);
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let addr = serve(Some(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ))
        .await;
        let source = source_for(addr, Duration::from_secs(5));

        let err = source.fetch_words(Language::En, Level::A1).await.unwrap_err();
        match err {
            Error::NotFound { url } => assert!(url.contains("lv=A1") && url.contains("ut=en")),
            other => panic!("expected NotFound, got {other:?}"),
        }

        let asset = AudioAsset::from_raw_id(Level::A1, "A1-0001").unwrap();
        let err = source.fetch_audio(&asset).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn server_error_keeps_its_status() {
        let addr = serve(Some(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ))
        .await;
        let source = source_for(addr, Duration::from_secs(5));

        let err = source.fetch_words(Language::Fr, Level::A2_2).await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let addr = serve(None).await;
        let source = source_for(addr, Duration::from_millis(200));

        let err = source.fetch_words(Language::En, Level::A1).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn ok_page_comes_back_as_text() {
        let addr = serve(Some(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"DATA\":[]}",
        ))
        .await;
        let source = source_for(addr, Duration::from_secs(5));

        let body = source.fetch_words(Language::En, Level::A1).await.unwrap();
        assert_eq!(body, r#"{"DATA":[]}"#);
    }
}
